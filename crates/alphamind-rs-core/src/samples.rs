//! Built-in sample records used when the backend cannot be reached.

use alphamind_rs_protocol::{
    Agent, AgentMetrics, AgentPatch, AgentStatus, AgentTemplate, DataFile, Dataset,
    DatasetStatus, FileStatus, KnowledgeBase, KnowledgeBaseStatus, Metadata, SearchResult,
};
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::Value;

pub fn sample_agents() -> Vec<Agent> {
    let now = Utc::now();
    vec![
        Agent {
            id: "1".to_string(),
            name: "Customer Support Agent".to_string(),
            description: "Handles customer inquiries and support requests".to_string(),
            personality: "Friendly, helpful, and professional".to_string(),
            skills: strings(&["customer service", "problem solving", "product knowledge"]),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            status: AgentStatus::Active,
            metrics: Some(AgentMetrics {
                total_conversations: 150,
                average_response_time: 1.2,
                satisfaction_score: 4.5,
            }),
            created_at: now - Duration::days(1),
            updated_at: now,
        },
        Agent {
            id: "2".to_string(),
            name: "Sales Assistant".to_string(),
            description: "Helps with sales inquiries and product recommendations".to_string(),
            personality: "Enthusiastic, knowledgeable, and persuasive".to_string(),
            skills: strings(&["sales", "product knowledge", "lead qualification"]),
            model: "gpt-4".to_string(),
            temperature: 0.8,
            max_tokens: 1500,
            status: AgentStatus::Active,
            metrics: Some(AgentMetrics {
                total_conversations: 89,
                average_response_time: 1.5,
                satisfaction_score: 4.2,
            }),
            created_at: now - Duration::days(2),
            updated_at: now,
        },
    ]
}

pub fn sample_templates() -> Vec<AgentTemplate> {
    vec![
        AgentTemplate {
            id: "customer-support".to_string(),
            name: "Customer Support".to_string(),
            description: "A helpful customer support agent".to_string(),
            category: "Support".to_string(),
            config: AgentPatch {
                personality: Some("Friendly, helpful, and professional".to_string()),
                skills: Some(strings(&["customer service", "problem solving"])),
                model: Some("gpt-3.5-turbo".to_string()),
                temperature: Some(0.7),
                ..AgentPatch::default()
            },
        },
        AgentTemplate {
            id: "sales-assistant".to_string(),
            name: "Sales Assistant".to_string(),
            description: "A persuasive sales assistant".to_string(),
            category: "Sales".to_string(),
            config: AgentPatch {
                personality: Some("Enthusiastic and knowledgeable".to_string()),
                skills: Some(strings(&["sales", "product knowledge"])),
                model: Some("gpt-4".to_string()),
                temperature: Some(0.8),
                ..AgentPatch::default()
            },
        },
    ]
}

pub fn sample_files() -> Vec<DataFile> {
    let now = Utc::now();
    vec![
        DataFile {
            id: "1".to_string(),
            name: "sample-data.csv".to_string(),
            mime_type: "text/csv".to_string(),
            size: 1_024_000,
            status: FileStatus::Completed,
            uploaded_at: now - Duration::days(1),
            processed_at: Some(now - Duration::days(1) + Duration::hours(1)),
            metadata: None,
            url: None,
        },
        DataFile {
            id: "2".to_string(),
            name: "training-docs.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 2_048_000,
            status: FileStatus::Processing,
            uploaded_at: now - Duration::hours(1),
            processed_at: None,
            metadata: None,
            url: None,
        },
    ]
}

pub fn sample_datasets() -> Vec<Dataset> {
    let now = Utc::now();
    vec![Dataset {
        id: "1".to_string(),
        name: "Customer Support Data".to_string(),
        description: "Historical customer support conversations".to_string(),
        files: strings(&["1"]),
        total_size: 1_024_000,
        status: DatasetStatus::Active,
        created_at: now - Duration::days(1),
        updated_at: now,
    }]
}

pub fn sample_knowledge_bases() -> Vec<KnowledgeBase> {
    let now = Utc::now();
    vec![KnowledgeBase {
        id: "1".to_string(),
        name: "Product Knowledge Base".to_string(),
        description: "Comprehensive product information and FAQs".to_string(),
        datasets: strings(&["1"]),
        vector_count: 1500,
        status: KnowledgeBaseStatus::Ready,
        created_at: now - Duration::days(1),
        updated_at: now,
    }]
}

/// Single canned hit echoing the query.
pub fn sample_search_results(query: &str) -> Vec<SearchResult> {
    let mut metadata = Metadata::new();
    metadata.insert(
        "source".to_string(),
        Value::String("sample-data.csv".to_string()),
    );
    vec![SearchResult {
        id: "1".to_string(),
        content: format!("Mock search result for \"{query}\""),
        score: 0.95,
        metadata,
    }]
}

/// Plausible random metrics: up to 200 conversations, 0-3s latency, 3-5 satisfaction.
pub fn random_metrics() -> AgentMetrics {
    let mut rng = rand::rng();
    AgentMetrics {
        total_conversations: rng.random_range(0..200),
        average_response_time: rng.random_range(0.0..3.0),
        satisfaction_score: rng.random_range(3.0..5.0),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::{random_metrics, sample_agents, sample_datasets, sample_files};

    #[test]
    fn sample_dataset_references_sample_file() {
        let files = sample_files();
        let dataset = &sample_datasets()[0];
        let total: u64 = files
            .iter()
            .filter(|file| dataset.files.contains(&file.id))
            .map(|file| file.size)
            .sum();
        assert_eq!(total, dataset.total_size);
        assert_eq!(sample_agents().len(), 2);
    }

    #[test]
    fn random_metrics_stay_in_range() {
        for _ in 0..50 {
            let metrics = random_metrics();
            assert!(metrics.total_conversations < 200);
            assert!((0.0..3.0).contains(&metrics.average_response_time));
            assert!((3.0..5.0).contains(&metrics.satisfaction_score));
        }
    }
}
