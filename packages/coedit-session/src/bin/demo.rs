//! Two editors typing into one room against an in-memory store.

use coedit_core::{apply, AuthorId, MemoryVersionStore, RoomId};
use coedit_session::{RoomEvent, SessionConfig, SessionHub};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = SessionConfig::from_env()?;
    let hub = SessionHub::new(MemoryVersionStore::new(), config)?;
    let room = RoomId::from("demo");
    let ada = AuthorId::from("ada");
    let bob = AuthorId::from("bob");

    let (_, _ada_events) = hub.join(&room, ada.clone(), "Ada").await?;
    let (_, mut bob_events) = hub.join(&room, bob.clone(), "Bob").await?;

    let first = hub
        .submit_edit(&room, ada.clone(), None, "", "Hello World")
        .await?;
    let base = first.version_id.clone();

    // Both edit the same version concurrently.
    hub.submit_edit(&room, ada.clone(), base.clone(), "Hello World", "Hello Beautiful World")
        .await?;
    hub.submit_edit(&room, bob.clone(), base, "Hello World", "Hello World!")
        .await?;

    // Bob never receives his own edit back; he only sees Ada's.
    let mut bob_text = String::new();
    while let Some(event) = bob_events.try_recv() {
        if let RoomEvent::Edit(edit) = event {
            bob_text = apply(&bob_text, &edit.operations)?;
            println!("bob <- {} {}", edit.version_id, edit.operations);
        }
    }

    let snapshot = hub.snapshot(&room).await?;
    println!("room text:  {:?}", snapshot.text);
    println!("bob's view of ada's edits: {bob_text:?}");
    for edit in hub.history(&room).await? {
        println!("{} {} {}", edit.timestamp, edit.editor_id, edit.operations);
    }

    hub.leave(&room, bob).await?;
    hub.leave(&room, ada).await?;
    hub.shutdown().await;
    Ok(())
}
