//! The publisher's long-running loop.
//!
//! One drain runs at startup to pick up whatever a previous process left
//! behind; afterwards the spool directory is watched for files moving in
//! and every batch of notifications triggers exactly one drain. A drain
//! that published anything is followed by one live-update publication.

use std::path::Path;
use std::sync::mpsc;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::git::rollover::publish_live_update;
use crate::git::CommitIdentity;
use crate::spool::drain::{drain, Drained};

use super::route::Router;
use super::{PublishError, Result};

/// Runs the publisher until a fatal error.
pub fn run(spool_dir: &Path, repo: &Path, identity: CommitIdentity) -> Result<()> {
    let mut router = Router::new(repo, identity);

    // Anything left over from a previous process.
    drain_and_publish(spool_dir, &mut router)?;

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(spool_dir, RecursiveMode::NonRecursive)?;
    info!(spool = %spool_dir.display(), "watching spool");

    loop {
        let first = rx.recv().map_err(|_| PublishError::WatchClosed)?;
        let mut relevant = triggers_drain(&first?);
        // Fold the rest of the batch into this wakeup.
        while let Ok(more) = rx.try_recv() {
            relevant |= triggers_drain(&more?);
        }
        if relevant {
            drain_and_publish(spool_dir, &mut router)?;
        }
    }
}

/// One drain; publish a live update if it integrated anything.
fn drain_and_publish(spool_dir: &Path, router: &mut Router) -> Result<()> {
    match drain(spool_dir, |entry| router.integrate(entry))? {
        Drained::Published => {
            publish_live_update(router.repo(), router.identity())?;
            Ok(())
        }
        Drained::Empty => {
            warn!("drain published nothing");
            Ok(())
        }
    }
}

/// Whether an event can mean a spool file finished moving into place.
///
/// Renames into the directory are the publication signal. Creation and
/// data writes of `.partial` files also arrive on this watch and are
/// harmless to act on (the drain just finds nothing ready), so only
/// clearly irrelevant kinds are filtered out.
fn triggers_drain(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Create(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RenameMode};

    fn event_of(kind: EventKind) -> Event {
        Event::new(kind)
    }

    #[test]
    fn rename_and_create_events_trigger_a_drain() {
        assert!(triggers_drain(&event_of(EventKind::Modify(
            ModifyKind::Name(RenameMode::To)
        ))));
        assert!(triggers_drain(&event_of(EventKind::Modify(
            ModifyKind::Name(RenameMode::Both)
        ))));
        assert!(triggers_drain(&event_of(EventKind::Create(
            CreateKind::File
        ))));
    }

    #[test]
    fn removals_and_data_writes_do_not() {
        assert!(!triggers_drain(&event_of(EventKind::Remove(
            notify::event::RemoveKind::File
        ))));
        assert!(!triggers_drain(&event_of(EventKind::Modify(
            ModifyKind::Data(notify::event::DataChange::Any)
        ))));
        assert!(!triggers_drain(&event_of(EventKind::Access(
            notify::event::AccessKind::Any
        ))));
    }
}
