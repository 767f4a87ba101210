//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for Vector Stores API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vector Stores API",
        version = "0.1.0",
        description = "OpenAI-compatible vector stores backed by PostgreSQL and pgvector. \
                       Every /v1 route requires `Authorization: Bearer <SERVER_API_KEY>`.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    nest(
        (path = "/v1", api = domain_vector_stores::handlers::ApiDoc)
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_nested_under_v1() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/vector_stores"));
        assert!(doc.paths.paths.contains_key("/v1/vector_stores/{id}/search"));
    }
}
