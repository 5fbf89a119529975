use charon::bucket::BucketFactory;
use charon::{lookup, CacheTable, Coordinator, Event};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    // The table belongs to us, not to the coordinator.
    let table = CacheTable::shared();
    let factory = BucketFactory::new();
    let buckets = factory.directory();
    let (events, mut stream) = charon::event::channel(16);

    let coord = Coordinator::spawn(table.clone(), Box::new(factory), events);

    let handle = coord.create("shopping").await.expect("create");
    assert_eq!(lookup(&table, "shopping"), Some(handle.clone()));

    let client = buckets.get(handle.pid()).expect("bucket client");
    client.put("milk", "2");
    println!("milk = {:?}", client.get("milk").await);

    handle.kill();
    while let Some(event) = stream.recv().await {
        println!("event: {:?}", event);
        if matches!(event, Event::Died { ref name, .. } if name == "shopping") {
            break;
        }
    }

    // The death event arrived, so the entry is already gone.
    assert!(lookup(&table, "shopping").is_none());
}
