//! Request templates and their resolution into transport requests

use std::collections::BTreeMap;

use serde::Deserialize;

use super::template::Resolver;
use crate::common::{Error, Result};
use crate::transport::HttpRequest;
use crate::value::{Mapping, Value};

/// A request as declared in a scenario file, placeholders unresolved
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RequestTemplate {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// JSON body; absent means no body is sent
    #[serde(default)]
    pub body: Option<Mapping>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestTemplate {
    /// Check the parts that can be validated before any variable exists
    pub fn validate(&self) -> Result<()> {
        reqwest::Method::from_bytes(self.method.as_bytes())
            .map_err(|_| Error::Config(format!("invalid HTTP method '{}'", self.method)))?;
        Ok(())
    }

    /// Resolve every placeholder and encode the body.
    ///
    /// Called once per attempt; the returned request is handed to the
    /// transport by value and never reused.
    pub fn build(&self, base_url: &str, resolver: &Resolver<'_>) -> Result<HttpRequest> {
        let url = format!("{}{}", base_url, resolver.resolve_str(&self.path));

        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), resolver.resolve_str(value)))
            .collect();

        let query = self
            .query
            .iter()
            .map(|(name, value)| (name.clone(), resolver.resolve_str(value)))
            .collect();

        let body = match &self.body {
            Some(body) => {
                let resolved = resolver.resolve_value(&Value::Map(body.clone()));
                Some(serde_json::to_vec(&resolved)?)
            }
            None => None,
        };

        Ok(HttpRequest {
            method: self.method.to_uppercase(),
            url,
            headers,
            query,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::VariableStore;

    fn template(yaml: &str) -> RequestTemplate {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_build_resolves_all_parts() {
        let mut initial = Mapping::new();
        initial.insert("user_id".into(), Value::Int(42));
        initial.insert("token".into(), Value::from("abc"));
        let vars = VariableStore::new(initial);

        let request = template(
            r#"
method: post
path: /users/{{user_id}}
headers: { Authorization: "Bearer {{token}}" }
query: { page: "{{user_id}}" }
body: { id: "{{user_id}}", note: "user {{user_id}}" }
"#,
        )
        .build("http://localhost:8080", &Resolver::new(&vars))
        .unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "http://localhost:8080/users/42");
        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
        assert_eq!(request.query, vec![("page".to_string(), "42".to_string())]);
        assert_eq!(
            String::from_utf8(request.body.unwrap()).unwrap(),
            r#"{"id":42,"note":"user 42"}"#
        );
    }

    #[test]
    fn test_large_id_serializes_as_integer() {
        let mut initial = Mapping::new();
        initial.insert("order_id".into(), Value::Int(123456789012345));
        let vars = VariableStore::new(initial);

        let request = template("method: PUT\npath: /orders\nbody: { order_id: '{{order_id}}' }\n")
            .build("", &Resolver::new(&vars))
            .unwrap();

        assert_eq!(
            String::from_utf8(request.body.unwrap()).unwrap(),
            r#"{"order_id":123456789012345}"#
        );
    }

    #[test]
    fn test_no_body_when_absent() {
        let vars = VariableStore::default();
        let request = template("path: /health\n")
            .build("http://h", &Resolver::new(&vars))
            .unwrap();
        assert_eq!(request.method, "GET");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_method() {
        assert!(template("method: 'GE T'\n").validate().is_err());
        assert!(template("method: PATCH\n").validate().is_ok());
    }
}
