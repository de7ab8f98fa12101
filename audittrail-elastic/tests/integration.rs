use audittrail::{Context, Entry, Sink};
use audittrail_elastic::IndexSink;
use elasticsearch::{Elasticsearch, SearchParts};
use serde_json::json;
use tokio::runtime::Handle;
use uuid::Uuid;

struct Cleanup {
    client: Elasticsearch,
    index: String,
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        let client = self.client.clone();
        let index = self.index.clone();
        let handle = Handle::current();
        let _ = handle.block_on(async move {
            let _ = client
                .indices()
                .delete(elasticsearch::indices::IndicesDeleteParts::Index(&[&index]))
                .send()
                .await;
        });
    }
}

// Requires Elasticsearch running. If AUDITTRAIL_TEST_ELASTIC_URL is unset, the test skips.
#[tokio::test]
async fn indexes_audit_entries() {
    let url = match std::env::var("AUDITTRAIL_TEST_ELASTIC_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("skipping: set AUDITTRAIL_TEST_ELASTIC_URL (e.g. http://127.0.0.1:9200)");
            return;
        }
    };
    let index = format!("audit-entries-{}", Uuid::new_v4());

    let transport = elasticsearch::http::transport::Transport::single_node(&url).expect("transport");
    let client = Elasticsearch::new(transport);
    let sink = IndexSink::new(client.clone(), index.clone()).expect("valid sink");
    let _guard = Cleanup { client: client.clone(), index: index.clone() };

    let entry = Entry::builder("user-1", "login", "session").build().unwrap();
    sink.log(&Context::new(), entry).await.expect("failed to index entry");

    client
        .indices()
        .refresh(elasticsearch::indices::IndicesRefreshParts::Index(&[&index]))
        .send()
        .await
        .expect("failed to refresh index");

    let res = client
        .search(SearchParts::Index(&[&index]))
        .body(json!({"query": {"match_all": {}}}))
        .send()
        .await
        .expect("failed to execute search query")
        .json::<serde_json::Value>()
        .await
        .expect("failed to parse search response JSON");

    let hits = res["hits"]["hits"].as_array().expect("hits.hits array").clone();
    assert_eq!(hits.len(), 1, "expected exactly one indexed entry, found {}", hits.len());

    let source = &hits[0]["_source"];
    assert_eq!(source["actor"], "user-1");
    assert_eq!(source["action"], "login");
}

#[test]
fn rejects_empty_index_name() {
    let transport =
        elasticsearch::http::transport::Transport::single_node("http://127.0.0.1:9200").unwrap();
    let client = Elasticsearch::new(transport);
    assert!(IndexSink::new(client, "").is_err());
}
