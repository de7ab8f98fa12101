#![cfg(feature = "client")]
use audittrail::{Context, Entry, Sink};
use audittrail_kafka::StreamSink;
use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    message::BorrowedMessage,
    producer::FutureProducer,
    ClientConfig,
};
use testcontainers::{clients::Cli, core::WaitFor, images::generic::GenericImage, Container};

fn start_redpanda() -> (Cli, Container<GenericImage>, String) {
    let docker = Cli::default();
    let image = GenericImage::new("docker.redpanda.com/redpanda/redpanda", "v23.3.8")
        .with_wait_for(WaitFor::message("Started Kafka API"));
    let container = docker.run(image);
    let port = container.get_host_port_ipv4(9092);
    let brokers = format!("127.0.0.1:{}", port);
    (docker, container, brokers)
}

#[tokio::test]
#[ignore]
async fn publishes_audit_entries_to_kafka() {
    let (_cli, _node, brokers) = start_redpanda();
    let topic = "audit.entries";

    let producer: FutureProducer =
        ClientConfig::new().set("bootstrap.servers", &brokers).create().expect("producer");
    let sink = StreamSink::new(producer, topic).expect("valid sink");

    let entry = Entry::builder("user-1", "login", "session").build().unwrap();
    sink.log(&Context::new(), entry).await.expect("failed to publish entry");

    let consumer: StreamConsumer = ClientConfig::new()
        .set("group.id", "test-group")
        .set("bootstrap.servers", &brokers)
        .set("auto.offset.reset", "earliest")
        .create()
        .unwrap();
    consumer.subscribe(&[topic]).unwrap();

    let msg: BorrowedMessage = consumer.recv().await.unwrap();
    let payload = msg.payload().expect("payload");
    let val: serde_json::Value = serde_json::from_slice(payload).unwrap();
    assert_eq!(val["actor"], "user-1");
    assert_eq!(val["action"], "login");
    assert_eq!(msg.key(), Some("user-1".as_bytes()));
}

#[test]
fn rejects_empty_topic_name() {
    let producer: FutureProducer =
        ClientConfig::new().set("bootstrap.servers", "127.0.0.1:9092").create().expect("producer");
    assert!(StreamSink::new(producer, "").is_err());
}
