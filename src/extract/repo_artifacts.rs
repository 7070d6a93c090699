//! Extractor for the repository artifact survey shape.
//!
//! Pure and synchronous: one typed batch in, flat foreign-keyed rows out.
//! Null top-level repositories contribute nothing; null connection lists
//! and null elements are treated as empty; every child row carries the id
//! of its immediate parent only.

use anyhow::{Context, Result};

use crate::github::types::{RepoArtifactsResponse, RepositoryNode};

use super::entities::{
    BranchProtectionRuleRow, ExtractedEntities, ReleaseAssetRow, ReleaseRow, RepositoryRow,
    WorkflowRow,
};

/// Extract from raw response values, as handed over by the writer.
pub fn extract_from_values(batch: &[serde_json::Value]) -> Result<ExtractedEntities> {
    let typed: Vec<RepoArtifactsResponse> = batch
        .iter()
        .map(|value| {
            serde_json::from_value(value.clone())
                .context("Response value does not match the repo_artifacts shape")
        })
        .collect::<Result<_>>()?;
    Ok(extract(&typed))
}

/// Extract flat entity rows from a typed response batch.
pub fn extract(batch: &[RepoArtifactsResponse]) -> ExtractedEntities {
    let mut entities = ExtractedEntities::default();

    for response in batch {
        // A null repository (not found, access denied) contributes zero
        // rows to every table.
        let Some(repo) = &response.repository else {
            continue;
        };

        extract_repository(repo, &mut entities);
    }

    entities
}

fn extract_repository(repo: &RepositoryNode, entities: &mut ExtractedEntities) {
    entities.repositories.push(RepositoryRow {
        id: repo.id.clone(),
        name: repo.name.clone(),
        name_with_owner: repo.name_with_owner.clone(),
        description: repo.description.clone(),
        url: repo.url.clone(),
        license: repo
            .license_info
            .as_ref()
            .and_then(|l| l.spdx_id.clone()),
        default_branch: repo.default_branch_ref.as_ref().map(|r| r.name.clone()),
    });

    for release in repo.releases.present_nodes() {
        entities.releases.push(ReleaseRow {
            id: release.id.clone(),
            repository_id: repo.id.clone(),
            tag_name: release.tag_name.clone(),
            name: release.name.clone(),
            created_at: release.created_at.clone(),
            url: release.url.clone(),
        });

        for asset in release.release_assets.present_nodes() {
            entities.release_assets.push(ReleaseAssetRow {
                id: asset.id.clone(),
                release_id: release.id.clone(),
                name: asset.name.clone(),
                download_url: asset.download_url.clone(),
            });
        }
    }

    for rule in repo.branch_protection_rules.present_nodes() {
        entities.branch_protection_rules.push(BranchProtectionRuleRow {
            id: rule.id.clone(),
            repository_id: repo.id.clone(),
            pattern: rule.pattern.clone(),
            requires_approving_reviews: rule.requires_approving_reviews,
            required_approving_review_count: rule.required_approving_review_count,
            requires_code_owner_reviews: rule.requires_code_owner_reviews,
            requires_commit_signatures: rule.requires_commit_signatures,
            requires_linear_history: rule.requires_linear_history,
            allows_force_pushes: rule.allows_force_pushes,
            is_admin_enforced: rule.is_admin_enforced,
        });
    }

    // Workflow tree entries without blob text (binary files, submodules)
    // are filtered, not coalesced; content drives keyword detection and an
    // empty stand-in would only mask missing data.
    if let Some(tree) = &repo.workflows {
        for entry in tree.entries.as_deref().unwrap_or_default() {
            let Some(text) = entry.object.as_ref().and_then(|o| o.text.as_ref()) else {
                continue;
            };
            entities.workflows.push(WorkflowRow {
                repository_id: repo.id.clone(),
                path: format!(".github/workflows/{}", entry.name),
                content: text.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cosign_fixture() -> serde_json::Value {
        json!({
            "repository": {
                "id": "R_cosign",
                "name": "cosign",
                "nameWithOwner": "sigstore/cosign",
                "description": "Code signing and transparency for containers",
                "url": "https://github.com/sigstore/cosign",
                "licenseInfo": { "spdxId": "Apache-2.0" },
                "defaultBranchRef": { "name": "main" },
                "releases": {
                    "nodes": [{
                        "id": "REL_1",
                        "tagName": "v2.2.0",
                        "name": "v2.2.0",
                        "createdAt": "2023-10-10T00:00:00Z",
                        "url": "https://github.com/sigstore/cosign/releases/tag/v2.2.0",
                        "releaseAssets": {
                            "nodes": [
                                { "id": "A_1", "name": "cosign.sig", "downloadUrl": "https://example.invalid/cosign.sig" },
                                { "id": "A_2", "name": "cosign_sbom.spdx.json", "downloadUrl": "https://example.invalid/sbom" }
                            ]
                        }
                    }]
                },
                "branchProtectionRules": {
                    "nodes": [{
                        "id": "BPR_1",
                        "pattern": "main",
                        "requiresApprovingReviews": true,
                        "requiredApprovingReviewCount": 2,
                        "requiresCodeOwnerReviews": false,
                        "requiresCommitSignatures": true,
                        "requiresLinearHistory": false,
                        "allowsForcePushes": false,
                        "isAdminEnforced": false
                    }]
                },
                "workflows": {
                    "entries": [{
                        "name": "release.yml",
                        "type": "blob",
                        "object": { "text": "jobs:\n  release:\n    steps:\n      - run: cosign sign-blob\n" }
                    }]
                }
            }
        })
    }

    fn parse(value: serde_json::Value) -> RepoArtifactsResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extracts_full_repository() {
        let entities = extract(&[parse(cosign_fixture())]);

        assert_eq!(entities.repositories.len(), 1);
        assert_eq!(entities.releases.len(), 1);
        assert_eq!(entities.release_assets.len(), 2);
        assert_eq!(entities.workflows.len(), 1);
        assert_eq!(entities.branch_protection_rules.len(), 1);

        let repo = &entities.repositories[0];
        assert_eq!(repo.name_with_owner, "sigstore/cosign");
        assert_eq!(repo.license.as_deref(), Some("Apache-2.0"));

        assert_eq!(entities.workflows[0].path, ".github/workflows/release.yml");
    }

    #[test]
    fn test_null_repository_contributes_zero_rows() {
        let with_null = extract(&[
            parse(json!({ "repository": null })),
            parse(cosign_fixture()),
        ]);
        let without = extract(&[parse(cosign_fixture())]);

        assert_eq!(with_null.repositories.len(), without.repositories.len());
        assert_eq!(with_null.releases.len(), without.releases.len());
        assert_eq!(with_null.release_assets.len(), without.release_assets.len());
        assert_eq!(with_null.workflows.len(), without.workflows.len());
    }

    #[test]
    fn test_foreign_keys_reference_immediate_parent() {
        let entities = extract(&[parse(cosign_fixture())]);

        let repo_ids: Vec<&str> = entities.repositories.iter().map(|r| r.id.as_str()).collect();
        let release_ids: Vec<&str> = entities.releases.iter().map(|r| r.id.as_str()).collect();

        for release in &entities.releases {
            assert!(repo_ids.contains(&release.repository_id.as_str()));
        }
        for asset in &entities.release_assets {
            assert!(release_ids.contains(&asset.release_id.as_str()));
        }
        for rule in &entities.branch_protection_rules {
            assert!(repo_ids.contains(&rule.repository_id.as_str()));
        }
        for workflow in &entities.workflows {
            assert!(repo_ids.contains(&workflow.repository_id.as_str()));
        }
    }

    #[test]
    fn test_release_without_assets_still_emits_release() {
        let value = json!({
            "repository": {
                "id": "R_1",
                "name": "empty",
                "nameWithOwner": "org/empty",
                "description": null,
                "url": "https://github.com/org/empty",
                "licenseInfo": null,
                "defaultBranchRef": null,
                "releases": {
                    "nodes": [{
                        "id": "REL_1",
                        "tagName": "v0.1.0",
                        "name": null,
                        "createdAt": null,
                        "url": null,
                        "releaseAssets": { "nodes": null }
                    }]
                },
                "branchProtectionRules": { "nodes": null },
                "workflows": null
            }
        });

        let entities = extract(&[parse(value)]);
        assert_eq!(entities.repositories.len(), 1);
        assert_eq!(entities.releases.len(), 1);
        assert!(entities.release_assets.is_empty());
        assert!(entities.releases[0].name.is_none());
    }

    #[test]
    fn test_repository_without_releases() {
        let value = json!({
            "repository": {
                "id": "R_1",
                "name": "quiet",
                "nameWithOwner": "org/quiet",
                "description": null,
                "url": "https://github.com/org/quiet",
                "licenseInfo": null,
                "defaultBranchRef": null,
                "workflows": null
            }
        });

        let entities = extract(&[parse(value)]);
        assert_eq!(entities.repositories.len(), 1);
        assert!(entities.releases.is_empty());
        assert!(entities.release_assets.is_empty());
    }

    #[test]
    fn test_null_connection_elements_are_filtered() {
        let value = json!({
            "repository": {
                "id": "R_1",
                "name": "holey",
                "nameWithOwner": "org/holey",
                "description": null,
                "url": "https://github.com/org/holey",
                "licenseInfo": null,
                "defaultBranchRef": null,
                "releases": {
                    "nodes": [null, {
                        "id": "REL_1",
                        "tagName": "v1.0.0",
                        "name": null,
                        "createdAt": null,
                        "url": null,
                        "releaseAssets": { "nodes": [null] }
                    }, null]
                },
                "branchProtectionRules": { "nodes": null },
                "workflows": null
            }
        });

        let entities = extract(&[parse(value)]);
        assert_eq!(entities.releases.len(), 1);
        assert!(entities.release_assets.is_empty());
    }

    #[test]
    fn test_identical_asset_names_across_releases_not_deduplicated() {
        let value = json!({
            "repository": {
                "id": "R_1",
                "name": "docs",
                "nameWithOwner": "org/docs",
                "description": null,
                "url": "https://github.com/org/docs",
                "licenseInfo": null,
                "defaultBranchRef": null,
                "releases": {
                    "nodes": [
                        {
                            "id": "REL_1", "tagName": "v1", "name": null, "createdAt": null, "url": null,
                            "releaseAssets": { "nodes": [{ "id": "A_1", "name": "README.md", "downloadUrl": null }] }
                        },
                        {
                            "id": "REL_2", "tagName": "v2", "name": null, "createdAt": null, "url": null,
                            "releaseAssets": { "nodes": [{ "id": "A_2", "name": "README.md", "downloadUrl": null }] }
                        }
                    ]
                },
                "branchProtectionRules": { "nodes": null },
                "workflows": null
            }
        });

        let entities = extract(&[parse(value)]);
        assert_eq!(entities.release_assets.len(), 2);
        assert_eq!(entities.release_assets[0].release_id, "REL_1");
        assert_eq!(entities.release_assets[1].release_id, "REL_2");
    }

    #[test]
    fn test_workflow_entry_without_text_is_skipped() {
        let value = json!({
            "repository": {
                "id": "R_1",
                "name": "bin",
                "nameWithOwner": "org/bin",
                "description": null,
                "url": "https://github.com/org/bin",
                "licenseInfo": null,
                "defaultBranchRef": null,
                "workflows": {
                    "entries": [
                        { "name": "logo.png", "type": "blob", "object": { "text": null } },
                        { "name": "ci.yml", "type": "blob", "object": { "text": "on: push" } }
                    ]
                }
            }
        });

        let entities = extract(&[parse(value)]);
        assert_eq!(entities.workflows.len(), 1);
        assert_eq!(entities.workflows[0].path, ".github/workflows/ci.yml");
    }

    #[test]
    fn test_empty_batch_yields_empty_tables() {
        let entities = extract(&[]);
        assert!(entities.repositories.is_empty());
        assert!(entities.releases.is_empty());
        assert!(entities.release_assets.is_empty());
        assert!(entities.workflows.is_empty());
        assert!(entities.branch_protection_rules.is_empty());
    }
}
