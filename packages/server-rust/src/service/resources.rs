//! Read-only resources addressed by `postman://` URIs.

use std::sync::Arc;

use postman_mcp_core::{
    endpoint, to_pretty_json, ErrorEnvelope, ErrorKind, ResourceContents, ResourceDefinition,
    ResourceRouter, ResourceTemplateDefinition, RouteFailure, RouteParams, TemplateError,
    JSON_MIME_TYPE,
};
use serde_json::json;

use super::domain::apis::ACCEPT_V10;
use crate::traits::Upstream;
use crate::upstream::UpstreamRequest;

/// URI scheme of every resource this server exposes.
pub const SCHEME: &str = "postman";

fn workspace(p: &RouteParams) -> String {
    endpoint(["workspaces", p.value("workspaceId")])
}

fn global_variables(p: &RouteParams) -> String {
    endpoint(["workspaces", p.value("workspaceId"), "global-variables"])
}

fn collection(p: &RouteParams) -> String {
    endpoint(["collections", p.value("collectionId")])
}

fn collection_folder(p: &RouteParams) -> String {
    endpoint([
        "collections",
        p.value("collectionId"),
        "folders",
        p.value("folderId"),
    ])
}

fn collection_request(p: &RouteParams) -> String {
    endpoint([
        "collections",
        p.value("collectionId"),
        "requests",
        p.value("requestId"),
    ])
}

fn environment(p: &RouteParams) -> String {
    endpoint(["environments", p.value("environmentId")])
}

fn api(p: &RouteParams) -> String {
    endpoint(["apis", p.value("apiId")])
}

fn api_versions(p: &RouteParams) -> String {
    match p.get("versionId") {
        Some(version) => endpoint(["apis", p.value("apiId"), "versions", version]),
        None => endpoint(["apis", p.value("apiId"), "versions"]),
    }
}

fn api_schema_files(p: &RouteParams) -> String {
    endpoint([
        "apis",
        p.value("apiId"),
        "schemas",
        p.value("schemaId"),
        "files",
    ])
}

fn mock(p: &RouteParams) -> String {
    match p.get("detail") {
        Some(detail) => endpoint(["mocks", p.value("mockId"), detail]),
        None => endpoint(["mocks", p.value("mockId")]),
    }
}

fn monitor(p: &RouteParams) -> String {
    endpoint(["monitors", p.value("monitorId")])
}

/// The fixed router: seven direct resources and eleven templates.
///
/// # Errors
///
/// Returns [`TemplateError`] if a built-in pattern fails to parse.
pub fn postman_router() -> Result<ResourceRouter, TemplateError> {
    ResourceRouter::new(SCHEME)
        .direct(
            "workspaces",
            "Workspaces",
            "All workspaces the API key can access",
        )
        .direct(
            "collections",
            "Collections",
            "All collections the API key can access",
        )
        .direct(
            "environments",
            "Environments",
            "All environments the API key can access",
        )
        .direct("apis", "APIs", "All APIs the API key can access")
        .direct(
            "mocks",
            "Mock servers",
            "All mock servers the API key can access",
        )
        .direct(
            "monitors",
            "Monitors",
            "All monitors the API key can access",
        )
        .direct(
            "me",
            "Authenticated user",
            "The user and team that own the API key",
        )
        .template(
            "postman://workspaces/{workspaceId}",
            "Workspace",
            "One workspace and its elements",
            workspace,
        )?
        .template(
            "postman://workspaces/{workspaceId}/global-variables",
            "Workspace global variables",
            "Global variables of a workspace",
            global_variables,
        )?
        .template(
            "postman://collections/{collectionId}",
            "Collection",
            "One collection in Postman Collection Format v2.1",
            collection,
        )?
        .template(
            "postman://collections/{collectionId}/folders/{folderId}",
            "Collection folder",
            "One folder of a collection",
            collection_folder,
        )?
        .template(
            "postman://collections/{collectionId}/requests/{requestId}",
            "Collection request",
            "One request of a collection",
            collection_request,
        )?
        .template(
            "postman://environments/{environmentId}",
            "Environment",
            "One environment and its variables",
            environment,
        )?
        .template("postman://apis/{apiId}", "API", "One API definition", api)?
        .template(
            "postman://apis/{apiId}/versions{/versionId}",
            "API versions",
            "Published versions of an API, or one version when versionId is given",
            api_versions,
        )?
        .template(
            "postman://apis/{apiId}/schemas/{schemaId}/files",
            "API schema files",
            "Files of an API schema",
            api_schema_files,
        )?
        .template(
            "postman://mocks/{mockId}{/detail}",
            "Mock server",
            "One mock server; detail `call-logs` or `server-responses` reads that sub-resource",
            mock,
        )?
        .template(
            "postman://monitors/{monitorId}",
            "Monitor",
            "One monitor",
            monitor,
        )
}

/// Resource listings and reads, backed by the router and the upstream.
pub struct ResourceCatalog {
    router: ResourceRouter,
    upstream: Arc<dyn Upstream>,
    resources: Vec<ResourceDefinition>,
    templates: Vec<ResourceTemplateDefinition>,
}

impl ResourceCatalog {
    #[must_use]
    pub fn new(router: ResourceRouter, upstream: Arc<dyn Upstream>) -> Self {
        let resources = router.resources();
        let templates = router.resource_templates();
        Self {
            router,
            upstream,
            resources,
            templates,
        }
    }

    #[must_use]
    pub fn list_resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    #[must_use]
    pub fn list_templates(&self) -> &[ResourceTemplateDefinition] {
        &self.templates
    }

    /// Resolves `uri` and reads the endpoint it maps to.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidResource` envelope when the URI does not route, or
    /// the classified upstream failure.
    pub async fn read(&self, uri: &str) -> Result<Vec<ResourceContents>, ErrorEnvelope> {
        let route = self.router.resolve(uri).map_err(invalid_resource)?;
        tracing::debug!(
            uri,
            endpoint = %route.endpoint,
            template = ?route.template,
            "reading resource"
        );

        let mut request = UpstreamRequest::get(route.endpoint);
        if postman_mcp_core::resource_type(uri, SCHEME) == Some("apis") {
            request = request.accept(ACCEPT_V10);
        }
        let value = self.upstream.call(request).await.map_err(|err| {
            tracing::warn!(uri, error = %err, "resource read failed");
            ErrorEnvelope::from(err)
        })?;

        Ok(vec![ResourceContents {
            uri: uri.to_string(),
            mime_type: JSON_MIME_TYPE.to_string(),
            text: to_pretty_json(&value),
        }])
    }
}

fn invalid_resource(failure: RouteFailure) -> ErrorEnvelope {
    let uri = failure.uri().to_string();
    ErrorEnvelope::new(ErrorKind::InvalidResource, failure.to_string())
        .with_data(json!({ "uri": uri }))
}

#[cfg(test)]
mod tests {
    use postman_mcp_core::UpstreamError;
    use serde_json::json;

    use super::*;
    use crate::testing::FakeUpstream;

    fn catalog(upstream: Arc<FakeUpstream>) -> ResourceCatalog {
        ResourceCatalog::new(postman_router().unwrap(), upstream)
    }

    #[test]
    fn listings_are_in_registration_order() {
        let catalog = catalog(Arc::new(FakeUpstream::ok()));
        let uris: Vec<_> = catalog
            .list_resources()
            .iter()
            .map(|r| r.uri.as_str())
            .collect();
        assert_eq!(
            uris,
            vec![
                "postman://workspaces",
                "postman://collections",
                "postman://environments",
                "postman://apis",
                "postman://mocks",
                "postman://monitors",
                "postman://me"
            ]
        );
        let templates = catalog.list_templates();
        assert_eq!(templates.len(), 11);
        assert_eq!(
            templates[0].uri_template,
            "postman://workspaces/{workspaceId}"
        );
        assert_eq!(
            templates[7].uri_template,
            "postman://apis/{apiId}/versions{/versionId}"
        );
        assert!(templates.iter().all(|t| t.mime_type == JSON_MIME_TYPE));
    }

    #[test]
    fn template_endpoints() {
        let router = postman_router().unwrap();
        let cases = [
            ("postman://apis/abc123/versions/v1", "/apis/abc123/versions/v1"),
            ("postman://apis/abc123/versions", "/apis/abc123/versions"),
            ("postman://mocks/m-1", "/mocks/m-1"),
            ("postman://mocks/m-1/call-logs", "/mocks/m-1/call-logs"),
            ("postman://collections/c-1/folders/f-1", "/collections/c-1/folders/f-1"),
            ("postman://workspaces/ws-1/global-variables", "/workspaces/ws-1/global-variables"),
            ("postman://apis/a/schemas/s/files", "/apis/a/schemas/s/files"),
            ("postman://me", "/me"),
        ];
        for (uri, expected) in cases {
            assert_eq!(router.resolve(uri).unwrap().endpoint, expected, "{uri}");
        }
    }

    #[tokio::test]
    async fn read_renders_pretty_json() {
        let upstream = Arc::new(FakeUpstream::new(|_| Ok(json!({ "version": { "id": "v1" } }))));
        let catalog = catalog(upstream.clone());

        let contents = catalog
            .read("postman://apis/abc123/versions/v1")
            .await
            .unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].uri, "postman://apis/abc123/versions/v1");
        assert_eq!(contents[0].mime_type, "application/json");
        assert_eq!(
            contents[0].text,
            to_pretty_json(&json!({ "version": { "id": "v1" } }))
        );

        let request = upstream.last();
        assert_eq!(request.path, "/apis/abc123/versions/v1");
        assert_eq!(request.accept.as_deref(), Some(ACCEPT_V10));
    }

    #[tokio::test]
    async fn non_api_reads_use_default_accept() {
        let upstream = Arc::new(FakeUpstream::ok());
        let catalog = catalog(upstream.clone());
        catalog.read("postman://workspaces").await.unwrap();
        let request = upstream.last();
        assert_eq!(request.path, "/workspaces");
        assert_eq!(request.accept, None);
    }

    #[tokio::test]
    async fn unknown_type_is_invalid_resource() {
        let upstream = Arc::new(FakeUpstream::ok());
        let catalog = catalog(upstream.clone());
        let err = catalog.read("postman://unknown-type").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResource);
        assert!(err.message.contains("unknown-type"));
        assert_eq!(err.data, Some(json!({ "uri": "postman://unknown-type" })));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn upstream_failures_are_classified() {
        let upstream = Arc::new(FakeUpstream::new(|_| {
            Err(UpstreamError::NotFound {
                message: "collection not found".to_string(),
            })
        }));
        let err = catalog(upstream)
            .read("postman://collections/missing")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamNotFound);
        assert_eq!(err.data, Some(json!({ "status": 404 })));
    }
}
