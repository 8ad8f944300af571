use crate::error::ApiError;
use crate::models::{Task, TaskId, TaskStatus};
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// The REST surface the client relies on. Implementations must be shareable
/// across the worker threads that carry each request.
pub trait TaskApi: Send + Sync {
    /// Looks up the display name for `user_id`.
    fn check_user(&self, user_id: &str) -> Result<String, ApiError>;

    /// Fetches every task owned by `user_id`.
    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, ApiError>;

    fn create_task(&self, user_id: &str, title: &str, description: &str)
    -> Result<Reply, ApiError>;

    fn complete_task(&self, task_id: &TaskId) -> Result<Reply, ApiError>;

    fn update_task(&self, task_id: &TaskId, title: &str, description: &str)
    -> Result<Reply, ApiError>;

    fn delete_task(&self, task_id: &TaskId) -> Result<Reply, ApiError>;
}

/// Status and text body of a write request. Non-2xx statuses are replies too;
/// only transport failures are errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub message: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Deserialize)]
struct CheckUserResponse {
    username: String,
}

#[derive(Deserialize)]
struct RemoteTask {
    task_id: TaskId,
    task_title: Option<String>,
    task_description: Option<String>,
    status: TaskStatus,
}

impl From<RemoteTask> for Task {
    fn from(remote: RemoteTask) -> Self {
        Task {
            id: remote.task_id,
            title: remote.task_title.unwrap_or_default(),
            description: remote.task_description.unwrap_or_default(),
            status: remote.status,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest<'a> {
    task_title: &'a str,
    task_description: &'a str,
    user_id: &'a str,
}

#[derive(Serialize)]
struct StatusUpdateRequest {
    status: TaskStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditTaskRequest<'a> {
    task_title: &'a str,
    task_description: &'a str,
}

/// Blocking HTTP client for the task backend. Requests carry no timeout.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url.trim()).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(concat!("todoterm/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn into_reply(resp: Response) -> Result<Reply, ApiError> {
        let status = resp.status().as_u16();
        let message = resp.text()?;
        Ok(Reply { status, message })
    }

    fn read_success_body(resp: Response) -> Result<String, ApiError> {
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(ApiError::status(status, &body));
        }
        Ok(body)
    }
}

impl TaskApi for HttpBackend {
    fn check_user(&self, user_id: &str) -> Result<String, ApiError> {
        let resp = self
            .client
            .get(self.endpoint(&["check-user"]))
            .query(&[("user_id", user_id)])
            .send()?;
        let body = Self::read_success_body(resp)?;
        let parsed: CheckUserResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(parsed.username)
    }

    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, ApiError> {
        let resp = self
            .client
            .get(self.endpoint(&["tasks"]))
            .query(&[("user_id", user_id)])
            .send()?;
        let body = Self::read_success_body(resp)?;
        let items: Vec<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RemoteTask>(item) {
                Ok(remote) => Some(Task::from(remote)),
                Err(err) => {
                    warn!(%err, "skipping malformed task");
                    None
                }
            })
            .collect())
    }

    fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Reply, ApiError> {
        let resp = self
            .client
            .post(self.endpoint(&["tasks"]))
            .json(&CreateTaskRequest {
                task_title: title,
                task_description: description,
                user_id,
            })
            .send()?;
        Self::into_reply(resp)
    }

    fn complete_task(&self, task_id: &TaskId) -> Result<Reply, ApiError> {
        let resp = self
            .client
            .put(self.endpoint(&["tasks", task_id.as_str()]))
            .json(&StatusUpdateRequest {
                status: TaskStatus::Completed,
            })
            .send()?;
        Self::into_reply(resp)
    }

    fn update_task(
        &self,
        task_id: &TaskId,
        title: &str,
        description: &str,
    ) -> Result<Reply, ApiError> {
        let resp = self
            .client
            .put(self.endpoint(&["tasks", "edit", task_id.as_str()]))
            .json(&EditTaskRequest {
                task_title: title,
                task_description: description,
            })
            .send()?;
        Self::into_reply(resp)
    }

    fn delete_task(&self, task_id: &TaskId) -> Result<Reply, ApiError> {
        let resp = self
            .client
            .delete(self.endpoint(&["tasks", task_id.as_str()]))
            .send()?;
        Self::into_reply(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    struct Captured {
        method: String,
        url: String,
        body: String,
    }

    /// Serves exactly one request with the given status and body, then
    /// returns what the client sent.
    fn serve_once(status: u16, body: &'static str) -> (String, thread::JoinHandle<Captured>) {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind test server");
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .expect("test server port");
        let handle = thread::spawn(move || {
            let mut request = server.recv().expect("receive request");
            let mut sent = String::new();
            request
                .as_reader()
                .read_to_string(&mut sent)
                .expect("read body");
            let captured = Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                body: sent,
            };
            let response = tiny_http::Response::from_string(body).with_status_code(status);
            request.respond(response).expect("respond");
            captured
        });
        (format!("http://127.0.0.1:{port}"), handle)
    }

    #[test]
    fn list_tasks_decodes_wire_shape() {
        let (base, handle) = serve_once(
            200,
            r#"[{"task_id":1,"task_title":"Buy milk","task_description":"2%","status":"pending"},
                {"task_id":"2","task_title":"Call","task_description":null,"status":"completed"}]"#,
        );
        let api = HttpBackend::new(&base).expect("client");

        let tasks = api.list_tasks("42").expect("list tasks");
        let captured = handle.join().expect("server thread");

        assert_eq!(captured.method, "GET");
        assert_eq!(captured.url, "/tasks?user_id=42");
        assert_eq!(
            tasks,
            vec![
                Task {
                    id: TaskId::new("1"),
                    title: "Buy milk".to_string(),
                    description: "2%".to_string(),
                    status: TaskStatus::Pending,
                },
                Task {
                    id: TaskId::new("2"),
                    title: "Call".to_string(),
                    description: String::new(),
                    status: TaskStatus::Completed,
                },
            ]
        );
    }

    #[test]
    fn list_tasks_skips_malformed_items() {
        let (base, handle) = serve_once(
            200,
            r#"[{"task_id":1,"task_title":"Buy milk","task_description":"","status":"pending"},
                {"task_id":2,"task_title":null,"task_description":"","status":"archived"},
                {"task_title":"no id","status":"pending"}]"#,
        );
        let api = HttpBackend::new(&base).expect("client");

        let tasks = api.list_tasks("42").expect("list tasks");
        handle.join().expect("server thread");

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[1].id, TaskId::new("2"));
        assert_eq!(tasks[1].title, "");
        assert_eq!(tasks[1].status, TaskStatus::Unknown);
        assert!(!tasks[1].is_pending());
    }

    #[test]
    fn list_tasks_reports_non_success_status() {
        let (base, handle) = serve_once(500, "boom");
        let api = HttpBackend::new(&base).expect("client");

        let err = api.list_tasks("42").expect_err("should fail");
        handle.join().expect("server thread");

        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[test]
    fn check_user_reads_username() {
        let (base, handle) = serve_once(200, r#"{"username":"ada"}"#);
        let api = HttpBackend::new(&base).expect("client");

        let username = api.check_user("7").expect("check user");
        let captured = handle.join().expect("server thread");

        assert_eq!(username, "ada");
        assert_eq!(captured.url, "/check-user?user_id=7");
    }

    #[test]
    fn create_task_sends_camel_case_body_and_keeps_error_replies() {
        let (base, handle) = serve_once(400, "Missing fields");
        let api = HttpBackend::new(&base).expect("client");

        let reply = api.create_task("42", "Buy milk", "2%").expect("reply");
        let captured = handle.join().expect("server thread");

        assert_eq!(captured.method, "POST");
        assert_eq!(captured.url, "/tasks");
        let body: serde_json::Value = serde_json::from_str(&captured.body).expect("json body");
        assert_eq!(
            body,
            serde_json::json!({"taskTitle": "Buy milk", "taskDescription": "2%", "userId": "42"})
        );
        assert_eq!(reply.status, 400);
        assert!(!reply.is_success());
        assert_eq!(reply.message, "Missing fields");
    }

    #[test]
    fn complete_and_edit_use_distinct_paths() {
        let (base, handle) = serve_once(200, "Task updated");
        let api = HttpBackend::new(&format!("{base}/")).expect("client");
        api.complete_task(&TaskId::new("9")).expect("complete");
        let captured = handle.join().expect("server thread");
        assert_eq!(captured.method, "PUT");
        assert_eq!(captured.url, "/tasks/9");
        assert_eq!(captured.body, r#"{"status":"completed"}"#);

        let (base, handle) = serve_once(200, "Task edited");
        let api = HttpBackend::new(&base).expect("client");
        api.update_task(&TaskId::new("9"), "New", "")
            .expect("update");
        let captured = handle.join().expect("server thread");
        assert_eq!(captured.url, "/tasks/edit/9");
        assert_eq!(captured.body, r#"{"taskTitle":"New","taskDescription":""}"#);
    }

    #[test]
    fn delete_task_uses_delete_method() {
        let (base, handle) = serve_once(200, "Task deleted");
        let api = HttpBackend::new(&base).expect("client");

        let reply = api.delete_task(&TaskId::new("3")).expect("delete");
        let captured = handle.join().expect("server thread");

        assert_eq!(captured.method, "DELETE");
        assert_eq!(captured.url, "/tasks/3");
        assert!(reply.is_success());
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpBackend::new("mailto:someone@example.com"),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
