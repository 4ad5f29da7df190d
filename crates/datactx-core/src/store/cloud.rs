//! HTTP store backend for hosted deployments

use super::{StoreBackend, StoreKey};
use crate::config::VariableSchema;
use crate::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONTENT_TYPE: &str = "application/vnd.api+json";

/// Credentials for the hosted API. All three fields are required.
#[derive(Clone, PartialEq)]
pub struct CloudCredentials {
    base_url: Url,
    organization_id: String,
    access_token: String,
}

impl CloudCredentials {
    pub fn new(
        base_url: Option<String>,
        organization_id: Option<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        let missing: Vec<&str> = [
            ("base_url", present(&base_url)),
            ("organization_id", present(&organization_id)),
            ("access_token", present(&access_token)),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(field, _)| field)
        .collect();
        if !missing.is_empty() {
            return Err(Error::MissingCredentials {
                target: "cloud backend".to_string(),
                missing: missing.join(", "),
            });
        }

        let raw_url = base_url.unwrap_or_default();
        let parsed = Url::parse(&raw_url)
            .map_err(|e| Error::configuration(format!("invalid base_url `{raw_url}`: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "base_url `{raw_url}` must use http or https"
            )));
        }

        Ok(Self {
            base_url: parsed,
            organization_id: organization_id.unwrap_or_default(),
            access_token: access_token.unwrap_or_default(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

impl fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudCredentials")
            .field("base_url", &self.base_url.as_str())
            .field("organization_id", &self.organization_id)
            .field("access_token", &crate::masking::MASKED)
            .finish()
    }
}

/// Store backend speaking JSON:API to the hosted service.
///
/// Each backend serves one resource type, e.g. `data_context_variables`,
/// addressed as `<base>/organizations/<org>/<resource-type>[/<key>...]`.
#[derive(Debug)]
pub struct CloudStoreBackend {
    credentials: CloudCredentials,
    resource_type: String,
    client: Client,
}

impl CloudStoreBackend {
    pub fn new(credentials: CloudCredentials, resource_type: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Cloud {
                message: e.to_string(),
            })?;
        Ok(Self {
            credentials,
            resource_type: resource_type.into(),
            client,
        })
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// URL for `key`. The whole-document key maps to the collection itself.
    pub fn resource_url(&self, key: &StoreKey) -> Result<Url> {
        let mut url = self.credentials.base_url.clone();
        let resource = self.resource_type.replace('_', "-");
        let whole_document = key.is_empty()
            || key.parts() == [VariableSchema::AllVariables.as_str()]
            || key.parts() == [self.resource_type.as_str()];
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::configuration("base_url cannot hold a path"))?;
            segments
                .pop_if_empty()
                .extend(["organizations", self.credentials.organization_id.as_str(), resource.as_str()]);
            if !whole_document {
                segments.extend(key.parts());
            }
        }
        Ok(url)
    }

    /// JSON:API body for writing `value`.
    pub fn request_payload(&self, value: &Value) -> Value {
        json!({
            "data": {
                "type": self.resource_type,
                "attributes": {
                    "organization_id": self.credentials.organization_id,
                    self.resource_type.as_str(): value,
                }
            }
        })
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .bearer_auth(&self.credentials.access_token)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .send()
            .map_err(|e| Error::Cloud {
                message: e.to_string(),
            })
    }

    fn check(response: Response, key: &StoreKey) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::key_lookup(key));
        }
        if !status.is_success() {
            return Err(Error::Cloud {
                message: format!("{} returned {status}", response.url()),
            });
        }
        Ok(response)
    }

    fn attributes(&self, body: Value) -> Value {
        let attributes = body.pointer("/data/attributes").cloned();
        match attributes {
            Some(Value::Object(mut map)) => map
                .remove(&self.resource_type)
                .unwrap_or(Value::Object(map)),
            Some(other) => other,
            None => body,
        }
    }
}

impl StoreBackend for CloudStoreBackend {
    fn get(&self, key: &StoreKey) -> Result<Value> {
        let url = self.resource_url(key)?;
        let response = Self::check(self.send(self.client.get(url))?, key)?;
        let body: Value = response.json().map_err(|e| Error::Cloud {
            message: e.to_string(),
        })?;
        Ok(self.attributes(body))
    }

    fn set(&mut self, key: &StoreKey, value: Value) -> Result<()> {
        let url = self.resource_url(key)?;
        let payload = self.request_payload(&value);
        Self::check(self.send(self.client.put(url).json(&payload))?, key)?;
        tracing::debug!(resource_type = %self.resource_type, key = %key, "Saved to cloud backend");
        Ok(())
    }

    fn remove_key(&mut self, key: &StoreKey) -> Result<()> {
        let url = self.resource_url(key)?;
        match Self::check(self.send(self.client.delete(url))?, key) {
            Ok(_) => Ok(()),
            Err(Error::KeyLookup { .. }) => Err(Error::backend(format!(
                "cannot remove absent key {key}"
            ))),
            Err(e) => Err(e),
        }
    }

    fn list_keys(&self, prefix: &StoreKey) -> Result<Vec<StoreKey>> {
        let url = self.resource_url(&StoreKey::root())?;
        let response = Self::check(self.send(self.client.get(url))?, prefix)?;
        let body: Value = response.json().map_err(|e| Error::Cloud {
            message: e.to_string(),
        })?;
        let items = body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_str))
            .map(StoreKey::single)
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    fn has_key(&self, key: &StoreKey) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(Error::KeyLookup { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn config(&self) -> Value {
        json!({
            "class_name": "CloudStoreBackend",
            "base_url": self.credentials.base_url.as_str(),
            "resource_type": self.resource_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn credentials() -> CloudCredentials {
        CloudCredentials::new(
            Some("https://api.example.invalid/".to_string()),
            Some("org-1".to_string()),
            Some("token-xyz".to_string()),
        )
        .unwrap()
    }

    #[rstest]
    #[case(None, Some("org"), Some("tok"), "base_url")]
    #[case(Some("https://x.invalid"), None, Some("tok"), "organization_id")]
    #[case(Some("https://x.invalid"), Some("org"), Some(""), "access_token")]
    #[case(None, None, None, "base_url, organization_id, access_token")]
    fn every_credential_is_required(
        #[case] base_url: Option<&str>,
        #[case] org: Option<&str>,
        #[case] token: Option<&str>,
        #[case] missing: &str,
    ) {
        let err = CloudCredentials::new(
            base_url.map(str::to_string),
            org.map(str::to_string),
            token.map(str::to_string),
        )
        .unwrap_err();
        match err {
            Error::MissingCredentials { missing: m, .. } => assert_eq!(m, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = CloudCredentials::new(
            Some("ftp://x.invalid".to_string()),
            Some("org".to_string()),
            Some("tok".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn debug_hides_access_token() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("token-xyz"));
        assert!(rendered.contains("org-1"));
    }

    #[test]
    fn builds_resource_urls() {
        let backend = CloudStoreBackend::new(credentials(), "data_context_variables").unwrap();
        assert_eq!(
            backend
                .resource_url(&StoreKey::single("data_context_variables"))
                .unwrap()
                .as_str(),
            "https://api.example.invalid/organizations/org-1/data-context-variables"
        );

        let suites = CloudStoreBackend::new(credentials(), "expectation_suite").unwrap();
        assert_eq!(
            suites.resource_url(&StoreKey::single("abc 1")).unwrap().as_str(),
            "https://api.example.invalid/organizations/org-1/expectation-suite/abc%201"
        );
    }

    #[test]
    fn payload_wraps_value_in_json_api_envelope() {
        let backend = CloudStoreBackend::new(credentials(), "data_context_variables").unwrap();
        assert_eq!(
            backend.request_payload(&json!({"config_version": 3.0})),
            json!({
                "data": {
                    "type": "data_context_variables",
                    "attributes": {
                        "organization_id": "org-1",
                        "data_context_variables": {"config_version": 3.0}
                    }
                }
            })
        );
    }
}
