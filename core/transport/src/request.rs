//! Request description handed to a [`Transport`](crate::Transport).

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use deskbridge_common::{query_value, Error, Result};

/// HTTP verbs the helpdesk API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One API call: verb, path relative to the API base, and query parameters.
///
/// All arguments travel in the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    /// Build a request from a textual verb.
    ///
    /// # Errors
    /// - `Error::InvalidMethod` if `method` is not a supported verb
    pub fn new(method: &str, path: impl Into<String>) -> Result<Self> {
        Ok(Self::with_method(method.parse()?, path))
    }

    pub fn with_method(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::with_method(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::with_method(Method::Post, path)
    }

    /// Append one query parameter. Null values are skipped.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(rendered) = query_value(&value.into()) {
            self.query.push((name.into(), rendered));
        }
        self
    }

    /// Value of the first query parameter named `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
