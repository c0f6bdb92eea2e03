//! End-to-end checks: lines in, store state and published batches out.

use async_trait::async_trait;
use chrono::Utc;
use heathack_hub::domain::{Batch, NodeId, Reading, SensorId};
use heathack_hub::error::PublishError;
use heathack_hub::ingest::Ingest;
use heathack_hub::publish::{self, Publisher};
use heathack_hub::registry::{SensorTypeRegistry, TemperatureRange};
use heathack_hub::snapshot;
use heathack_hub::store::HistoryStore;
use heathack_hub::transport;
use heathack_hub::validation::ValidationGate;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Recording(Mutex<Vec<Batch>>);

#[async_trait]
impl Publisher for Recording {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn publish(&self, batch: &Batch) -> Result<(), PublishError> {
        self.0.lock().push(batch.clone());
        Ok(())
    }
}

async fn feed(
    input: &str,
    depth: usize,
    range: TemperatureRange,
) -> (Arc<HistoryStore>, Vec<Batch>) {
    let recording = Arc::new(Recording::default());
    let (queue, worker) = publish::spawn_worker(recording.clone(), publish::DEFAULT_QUEUE_DEPTH);
    let store = Arc::new(HistoryStore::new(depth).unwrap());
    let gate = ValidationGate::new(SensorTypeRegistry::new(range));
    let ingest = Ingest::new(store.clone(), gate, queue);

    transport::run_lines(input.as_bytes(), &ingest).await.unwrap();
    drop(ingest);
    worker.await.unwrap();

    let batches = recording.0.lock().clone();
    (store, batches)
}

#[tokio::test]
async fn two_frames_give_current_and_history() {
    let (store, batches) = feed(
        "heathack A S1 1 20.0\nheathack A S1 1 21.0\n",
        20,
        TemperatureRange::Standard,
    )
    .await;

    let sensor = store
        .node(&NodeId::from("A"))
        .and_then(|n| n.sensor(&SensorId::from("S1")))
        .unwrap();
    assert_eq!(store.current(&sensor), Some(21.0));
    assert_eq!(store.history(&sensor).collect::<Vec<_>>(), vec![20.0, 21.0]);

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].readings, vec![Reading::new("S1", 1, 21.0)]);
}

#[tokio::test]
async fn publisher_sees_exactly_accepted_readings() {
    let input = "\
        boot banner\n\
        heathack 5 1 1 22.5 2 2 140 3 3 12\n\
        heathack 6 1 1 75.0\n\
        heathack 5 1 1 22.0 2 2 60 3\n";
    let (store, batches) = feed(input, 20, TemperatureRange::Standard).await;

    let published: Vec<(String, Vec<Reading>)> = batches
        .iter()
        .map(|b| (b.node_id.to_string(), b.readings.clone()))
        .collect();
    assert_eq!(
        published,
        vec![
            ("5".to_string(), vec![Reading::new("1", 1, 22.5), Reading::new("3", 3, 12.0)]),
            ("6".to_string(), vec![]),
            ("5".to_string(), vec![Reading::new("1", 1, 22.0), Reading::new("2", 2, 60.0)]),
        ]
    );

    // node 6 exists but has no sensors and no reading time
    let six = store.node(&NodeId::from("6")).unwrap();
    assert!(six.sensors().is_empty());
    assert_eq!(six.last_reading(), None);
}

#[tokio::test]
async fn extended_deployment_accepts_hot_pipe_reading() {
    let (_, batches) = feed("heathack 6 1 1 75.0\n", 20, TemperatureRange::Extended).await;
    assert_eq!(batches[0].readings, vec![Reading::new("1", 1, 75.0)]);
}

#[tokio::test]
async fn history_window_wraps() {
    let input: String = (1..=25)
        .map(|i| format!("heathack 1 1 2 {}\n", i))
        .collect();
    let (store, _) = feed(&input, 20, TemperatureRange::Standard).await;

    let view = snapshot::snapshot(&store, Utc::now());
    let sensor = &view.nodes["1"].sensors["1"];
    let expected: Vec<f64> = (6..=25).map(f64::from).collect();
    assert_eq!(sensor.history, expected);
    assert_eq!(sensor.current, Some(25.0));
}
