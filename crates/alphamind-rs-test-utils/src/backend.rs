use alphamind_rs_protocol::{
    Agent, AgentMetrics, AgentPatch, AgentTemplate, ApiRequest, ApiResponse, ChatRequest,
    DataFile, Dataset, DatasetPatch, FileStatus, KnowledgeBase, KnowledgeBasePatch,
    KnowledgeBaseStatus, Method, RequestBody, Transport, TransportError, new_record_id,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::sync::Arc;

#[derive(Default)]
struct BackendState {
    agents: Vec<Agent>,
    templates: Vec<AgentTemplate>,
    files: Vec<DataFile>,
    datasets: Vec<Dataset>,
    knowledge_bases: Vec<KnowledgeBase>,
    settings: Map<String, Value>,
}

/// Working backend that serves the default `/api/...` routes from memory.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BackendState>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(self, agents: Vec<Agent>) -> Self {
        self.state.lock().agents = agents;
        self
    }

    pub fn with_templates(self, templates: Vec<AgentTemplate>) -> Self {
        self.state.lock().templates = templates;
        self
    }

    pub fn with_datasets(self, datasets: Vec<Dataset>) -> Self {
        self.state.lock().datasets = datasets;
        self
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.state.lock().agents.clone()
    }

    pub fn files(&self) -> Vec<DataFile> {
        self.state.lock().files.clone()
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        self.state.lock().datasets.clone()
    }

    pub fn knowledge_bases(&self) -> Vec<KnowledgeBase> {
        self.state.lock().knowledge_bases.clone()
    }

    /// Stored settings document (sections that were written so far).
    pub fn settings(&self) -> Value {
        Value::Object(self.state.lock().settings.clone())
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        let mut state = self.state.lock();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["api", "agents"]) => ok(json!({ "agents": state.agents })),
            (Method::Get, ["api", "agents", "templates"]) => {
                ok(json!({ "templates": state.templates }))
            }
            (Method::Post, ["api", "agents"]) => match decode::<AgentPatch>(request) {
                Some(patch) => {
                    let agent = patch.into_agent(new_record_id());
                    state.agents.push(agent.clone());
                    ok(json!(agent))
                }
                None => bad_request(),
            },
            (Method::Put, ["api", "agents", id]) => {
                let Some(patch) = decode::<AgentPatch>(request) else {
                    return bad_request();
                };
                match state.agents.iter_mut().find(|agent| agent.id == *id) {
                    Some(agent) => {
                        patch.apply_to(agent);
                        ok(json!(agent))
                    }
                    None => not_found(),
                }
            }
            (Method::Delete, ["api", "agents", id]) => {
                remove_by(&mut state.agents, |agent| agent.id == *id)
            }
            (Method::Post, ["api", "agents", id, "test"]) => {
                let message = request
                    .json()
                    .and_then(|body| body.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                match state.agents.iter().find(|agent| agent.id == *id) {
                    Some(agent) => ok(json!({
                        "response": format!("{} received: {}", agent.name, message)
                    })),
                    None => not_found(),
                }
            }
            (Method::Get, ["api", "agents", id, "metrics"]) => {
                if !state.agents.iter().any(|agent| agent.id == *id) {
                    return not_found();
                }
                let metrics = AgentMetrics {
                    total_conversations: 3,
                    average_response_time: 1.5,
                    satisfaction_score: 4.5,
                };
                ok(json!({ "metrics": metrics }))
            }
            (Method::Post, ["api", "chat"]) => match decode::<ChatRequest>(request) {
                Some(chat) => ok(json!({
                    "message": format!("echo: {}", chat.message),
                    "metadata": { "historyLength": chat.history.len() }
                })),
                None => bad_request(),
            },
            (Method::Get, ["api", "data", "files"]) => ok(json!({ "files": state.files })),
            (Method::Post, ["api", "data", "files", "upload"]) => {
                let RequestBody::Multipart(form) = &request.body else {
                    return bad_request();
                };
                let mut file = DataFile::uploading(&form.file);
                file.advance(FileStatus::Processing);
                file.url = Some(format!("/files/{}", form.file.name));
                let url = file.url.clone();
                state.files.push(file);
                ok(json!({ "status": "processing", "url": url }))
            }
            (Method::Delete, ["api", "data", "files", id]) => {
                remove_by(&mut state.files, |file| file.id == *id)
            }
            (Method::Get, ["api", "data", "datasets"]) => {
                ok(json!({ "datasets": state.datasets }))
            }
            (Method::Post, ["api", "data", "datasets"]) => {
                let Some(body) = request.json() else {
                    return bad_request();
                };
                let dataset = Dataset::new(
                    body.get("name").and_then(Value::as_str).unwrap_or("Dataset"),
                    body.get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                );
                state.datasets.push(dataset.clone());
                ok(json!(dataset))
            }
            (Method::Put, ["api", "data", "datasets", id]) => {
                let Some(patch) = decode::<DatasetPatch>(request) else {
                    return bad_request();
                };
                match state.datasets.iter_mut().find(|dataset| dataset.id == *id) {
                    Some(dataset) => {
                        patch.apply_to(dataset);
                        ok(json!(dataset))
                    }
                    None => not_found(),
                }
            }
            (Method::Delete, ["api", "data", "datasets", id]) => {
                remove_by(&mut state.datasets, |dataset| dataset.id == *id)
            }
            (Method::Get, ["api", "data", "knowledge-bases"]) => {
                ok(json!({ "knowledgeBases": state.knowledge_bases }))
            }
            (Method::Post, ["api", "data", "knowledge-bases"]) => {
                let Some(body) = request.json() else {
                    return bad_request();
                };
                let datasets = body
                    .get("datasetIds")
                    .and_then(|value| serde_json::from_value(value.clone()).ok())
                    .unwrap_or_default();
                let mut knowledge_base = KnowledgeBase::indexing(
                    body.get("name").and_then(Value::as_str).unwrap_or("Knowledge Base"),
                    body.get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                    datasets,
                );
                knowledge_base.status = KnowledgeBaseStatus::Ready;
                knowledge_base.vector_count = 128;
                state.knowledge_bases.push(knowledge_base.clone());
                ok(json!(knowledge_base))
            }
            (Method::Put, ["api", "data", "knowledge-bases", id]) => {
                let Some(patch) = decode::<KnowledgeBasePatch>(request) else {
                    return bad_request();
                };
                match state.knowledge_bases.iter_mut().find(|kb| kb.id == *id) {
                    Some(knowledge_base) => {
                        patch.apply_to(knowledge_base);
                        ok(json!(knowledge_base))
                    }
                    None => not_found(),
                }
            }
            (Method::Delete, ["api", "data", "knowledge-bases", id]) => {
                remove_by(&mut state.knowledge_bases, |kb| kb.id == *id)
            }
            (Method::Get, ["api", "data", "search"]) => {
                let query = request.query_param("query").unwrap_or_default();
                ok(json!({
                    "results": [{
                        "id": "hit-1",
                        "content": format!("match for {query}"),
                        "score": 0.9,
                        "metadata": { "knowledgeBaseId": request.query_param("knowledgeBaseId") }
                    }]
                }))
            }
            (Method::Get, ["api", "settings"]) => {
                ok(json!({ "settings": Value::Object(state.settings.clone()) }))
            }
            (Method::Post, ["api", "settings", "reset"]) => {
                state.settings.clear();
                ok(json!({ "success": true }))
            }
            (Method::Post, ["api", "settings", "import"]) => match request.json() {
                Some(Value::Object(imported)) => {
                    state.settings = imported.clone();
                    ok(json!({ "success": true }))
                }
                _ => bad_request(),
            },
            (Method::Post, ["api", "settings", "integrations", _kind, "test"]) => {
                ok(json!({ "success": true }))
            }
            (Method::Post, ["api", "settings", section, "reset"]) => {
                state.settings.remove(*section);
                ok(json!({ "success": true }))
            }
            (Method::Put, ["api", "settings", section]) => {
                let Some(Value::Object(updates)) = request.json() else {
                    return bad_request();
                };
                let entry = state
                    .settings
                    .entry(section.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(current) = entry {
                    for (key, value) in updates {
                        current.insert(key.clone(), value.clone());
                    }
                }
                ok(entry.clone())
            }
            _ => not_found(),
        }
    }
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let response = self.handle(&request);
        self.requests.lock().push(request);
        Ok(response)
    }
}

fn decode<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> Option<T> {
    request
        .json()
        .and_then(|body| serde_json::from_value(body.clone()).ok())
}

fn remove_by<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> ApiResponse {
    let before = items.len();
    items.retain(|item| !matches(item));
    if items.len() == before {
        not_found()
    } else {
        ApiResponse::new(204, Value::Null)
    }
}

fn ok(body: Value) -> ApiResponse {
    ApiResponse::ok(body)
}

fn not_found() -> ApiResponse {
    ApiResponse::new(404, json!({ "error": "not found" }))
}

fn bad_request() -> ApiResponse {
    ApiResponse::new(400, json!({ "error": "bad request" }))
}
