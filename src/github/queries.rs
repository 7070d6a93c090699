//! GraphQL query text, one constant per query shape.

/// Shape name for the repository artifact survey query. Used as the
/// extractor dispatch key and as the raw-tier table suffix.
pub const REPO_ARTIFACTS_SHAPE: &str = "repo_artifacts";

/// One repository's supply-chain surface in a single round trip.
///
/// Page sizes are fixed: the survey intentionally samples the most recent
/// releases rather than paginating the full history.
pub const REPO_ARTIFACTS_QUERY: &str = r#"
query RepoArtifacts($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
    name
    nameWithOwner
    description
    url
    licenseInfo {
      spdxId
    }
    defaultBranchRef {
      name
    }
    releases(first: 50, orderBy: { field: CREATED_AT, direction: DESC }) {
      nodes {
        id
        tagName
        name
        createdAt
        url
        releaseAssets(first: 100) {
          nodes {
            id
            name
            downloadUrl
          }
        }
      }
    }
    branchProtectionRules(first: 20) {
      nodes {
        id
        pattern
        requiresApprovingReviews
        requiredApprovingReviewCount
        requiresCodeOwnerReviews
        requiresCommitSignatures
        requiresLinearHistory
        allowsForcePushes
        isAdminEnforced
      }
    }
    workflows: object(expression: "HEAD:.github/workflows") {
      ... on Tree {
        entries {
          name
          type
          object {
            ... on Blob {
              text
            }
          }
        }
      }
    }
  }
}
"#;
