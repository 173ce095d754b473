//! Jenkins JSON API client.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{
    BuildId, BuildParameter, BuildRecord, CiConnector, CiError, CiJob, CiResult, CiServer, TaskId,
};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

/// Connects to Jenkins over its JSON API with HTTP basic auth.
#[derive(Debug, Clone)]
pub struct JenkinsConnector<T> {
    transport: T,
}

impl<T> JenkinsConnector<T>
where
    T: HttpTransport + Clone + 'static,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T> CiConnector for JenkinsConnector<T>
where
    T: HttpTransport + Clone + 'static,
{
    fn connect(&self, base_url: &str, user: &str, token: &str) -> CiResult<Box<dyn CiServer>> {
        let session = Session {
            transport: self.transport.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            token: token.to_string(),
        };

        let url = session.url("/api/json");
        let response = session
            .send(HttpRequest::get(&url))
            .map_err(|reason| CiError::Connect {
                url: url.clone(),
                reason,
            })?;
        if !response.is_success() {
            return Err(CiError::Connect {
                url,
                reason: format!("status {}", response.status),
            });
        }

        debug!(url = %session.base_url, "Connected to Jenkins");
        Ok(Box::new(JenkinsServer { session }))
    }
}

#[derive(Debug, Clone)]
struct Session<T> {
    transport: T,
    base_url: String,
    user: String,
    token: String,
}

impl<T: HttpTransport> Session<T> {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let request = request.basic_auth(&self.user, &self.token);
        self.transport.send(&request).map_err(|e| e.to_string())
    }

    fn get_json<D: DeserializeOwned>(&self, path: &str) -> CiResult<D> {
        let url = self.url(path);
        let response = self
            .send(HttpRequest::get(&url))
            .map_err(|reason| CiError::Request {
                url: url.clone(),
                reason,
            })?;
        if !response.is_success() {
            return Err(CiError::Request {
                url,
                reason: format!("status {}", response.status),
            });
        }
        serde_json::from_slice(&response.body).map_err(|e| CiError::MalformedResponse {
            url,
            reason: e.to_string(),
        })
    }

    /// CSRF crumb header, when the server issues one.
    fn crumb(&self) -> Option<(String, String)> {
        let url = self.url("/crumbIssuer/api/json");
        let response = self.send(HttpRequest::get(url)).ok()?;
        if !response.is_success() {
            return None;
        }
        let crumb: Crumb = serde_json::from_slice(&response.body).ok()?;
        Some((crumb.crumb_request_field, crumb.crumb))
    }
}

struct JenkinsServer<T> {
    session: Session<T>,
}

impl<T> CiServer for JenkinsServer<T>
where
    T: HttpTransport + Clone + 'static,
{
    fn job(&self, name: &str) -> CiResult<Box<dyn CiJob>> {
        let url = self.session.url(&format!("/job/{}/api/json", name));
        let response = self
            .session
            .send(HttpRequest::get(&url))
            .map_err(|reason| CiError::Request {
                url: url.clone(),
                reason,
            })?;

        match response.status {
            404 => Err(CiError::JobNotFound(name.to_string())),
            _ if response.is_success() => Ok(Box::new(JenkinsJob {
                session: self.session.clone(),
                name: name.to_string(),
            })),
            status => Err(CiError::Request {
                url,
                reason: format!("status {}", status),
            }),
        }
    }

    fn queued_task_ids(&self) -> CiResult<Vec<TaskId>> {
        let queue: Queue = self.session.get_json("/queue/api/json")?;
        Ok(queue.items.into_iter().map(|item| item.id).collect())
    }
}

struct JenkinsJob<T> {
    session: Session<T>,
    name: String,
}

impl<T: HttpTransport> CiJob for JenkinsJob<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, parameters: &BTreeMap<String, String>) -> CiResult<TaskId> {
        let trigger_error = |reason: String| CiError::Trigger {
            job: self.name.clone(),
            reason,
        };

        let url = self
            .session
            .url(&format!("/job/{}/buildWithParameters", self.name));
        let mut request = HttpRequest::post(url).form(parameters.clone());
        if let Some((field, crumb)) = self.session.crumb() {
            request = request.header(field, crumb);
        }

        let response = self.session.send(request).map_err(trigger_error)?;
        if !response.is_success() {
            return Err(trigger_error(format!("status {}", response.status)));
        }

        let location = response
            .header("location")
            .ok_or_else(|| trigger_error("response has no Location header".to_string()))?;
        queue_id_from_location(location)
            .ok_or_else(|| trigger_error(format!("unexpected queue location {}", location)))
    }

    fn build_ids(&self) -> CiResult<Vec<BuildId>> {
        let job: JobBuilds = self
            .session
            .get_json(&format!("/job/{}/api/json?tree=allBuilds[number]", self.name))?;
        Ok(job.all_builds.into_iter().map(|b| b.number).collect())
    }

    fn build(&self, id: BuildId) -> CiResult<BuildRecord> {
        let build: Build = self
            .session
            .get_json(&format!("/job/{}/{}/api/json", self.name, id))?;
        Ok(build.into_record())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Crumb {
    crumb_request_field: String,
    crumb: String,
}

#[derive(Debug, Deserialize)]
struct Queue {
    #[serde(default)]
    items: Vec<QueueItem>,
}

#[derive(Debug, Deserialize)]
struct QueueItem {
    id: TaskId,
}

#[derive(Debug, Deserialize)]
struct JobBuilds {
    #[serde(rename = "allBuilds", default)]
    all_builds: Vec<BuildNumber>,
}

#[derive(Debug, Deserialize)]
struct BuildNumber {
    number: BuildId,
}

#[derive(Debug, Deserialize)]
struct Build {
    number: BuildId,
    #[serde(default)]
    building: bool,
    result: Option<String>,
    #[serde(default)]
    actions: Vec<Value>,
}

impl Build {
    fn into_record(self) -> BuildRecord {
        let parameters = self
            .actions
            .iter()
            .find_map(|action| action.get("parameters").and_then(Value::as_array))
            .map(|params| params.iter().filter_map(parameter).collect())
            .unwrap_or_default();

        BuildRecord {
            id: self.number,
            parameters,
            is_running: self.building,
            is_successful: !self.building && self.result.as_deref() == Some("SUCCESS"),
        }
    }
}

fn parameter(value: &Value) -> Option<BuildParameter> {
    let name = value.get("name")?.as_str()?;
    let value = match value.get("value")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(BuildParameter::new(name, value))
}

/// Parse `.../queue/item/{id}/` into `id`.
fn queue_id_from_location(location: &str) -> Option<TaskId> {
    let mut segments = location.trim_end_matches('/').rsplit('/');
    let id = segments.next()?.parse().ok()?;
    (segments.next()? == "item").then_some(id)
}
