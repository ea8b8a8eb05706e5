//! End-to-end publisher scenarios against a real `git` binary.
//!
//! Each test builds a working repository with a local bare `origin` and a
//! seed commit, drops entries into a spool directory, and runs the same
//! drain-then-publish sequence the watcher loop runs per notification
//! batch.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};

use irclog::git::rollover::{publish_live_update, NOW_LINK};
use irclog::git::{commit, run_logged, run_stdout, CommitIdentity};
use irclog::publish::route::Router;
use irclog::publish::PublishError;
use irclog::spool::drain::{drain, Drained};

/// 2021-06-04 05:01:02 UTC.
const TS_2021_06_04: u64 = 1622782862;
/// 2049-12-13 00:00:00 UTC.
const TS_2049_12_13: u64 = 2522966400;

struct Fixture {
    _root: TempDir,
    spool: PathBuf,
    repo: PathBuf,
}

fn fixture() -> Fixture {
    let root = tempdir().unwrap();

    let origin = root.path().join("origin.git");
    fs::create_dir_all(&origin).unwrap();
    run_logged(&origin, &["init", "--bare"]).unwrap();

    let repo = root.path().join("repo");
    fs::create_dir_all(&repo).unwrap();
    run_logged(&repo, &["init"]).unwrap();
    run_logged(&repo, &["remote", "add", "origin", origin.to_str().unwrap()]).unwrap();
    fs::write(repo.join("README"), "irc log archive\n").unwrap();
    run_logged(&repo, &["add", "."]).unwrap();
    commit(&repo, &CommitIdentity::default(), "seed").unwrap();
    run_logged(&repo, &["push", "origin", "HEAD:master"]).unwrap();

    let spool = root.path().join("spool");
    fs::create_dir_all(&spool).unwrap();

    Fixture {
        _root: root,
        spool,
        repo,
    }
}

fn seed_entry(spool: &Path, seq: u32, timestamp: u64, sender: &str, body: &str) {
    fs::write(
        spool.join(seq.to_string()),
        format!("{}\n{}\n{}", timestamp, sender, body),
    )
    .unwrap();
}

/// One watcher cycle: drain, then publish a live update if anything moved.
fn drain_and_publish(fx: &Fixture) -> Drained {
    let mut router = Router::new(&fx.repo, CommitIdentity::default());
    let outcome: Drained =
        drain::<PublishError, _>(&fx.spool, |entry| router.integrate(entry)).unwrap();
    if outcome == Drained::Published {
        publish_live_update(&fx.repo, &CommitIdentity::default()).unwrap();
    }
    outcome
}

fn branch_messages(repo: &Path, branch: &str) -> Vec<String> {
    run_stdout(repo, &["log", "--format=%s", branch])
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn spool_is_empty(spool: &Path) -> bool {
    fs::read_dir(spool).unwrap().next().is_none()
}

#[test]
fn single_entry_lands_in_its_day_file() {
    let fx = fixture();
    seed_entry(&fx.spool, 0, TS_2021_06_04, "fred", "hello there");

    assert_eq!(drain_and_publish(&fx), Drained::Published);

    assert_eq!(
        fs::read_to_string(fx.repo.join("2021/06-04.txt")).unwrap(),
        "1622782862\nfred\nhello there\n\n"
    );
    assert!(spool_is_empty(&fx.spool));
    assert_eq!(
        fs::read_link(fx.repo.join(NOW_LINK)).unwrap(),
        PathBuf::from("2021/06-04.txt")
    );
    assert_eq!(
        branch_messages(&fx.repo, "origin/live"),
        vec!["live update", "seed"]
    );
}

#[test]
fn day_rollover_closes_the_old_day_onto_master() {
    let fx = fixture();
    seed_entry(&fx.spool, 0, TS_2021_06_04, "fred", "morning");
    seed_entry(&fx.spool, 1, TS_2021_06_04 + 60, "wilma", "afternoon");
    seed_entry(&fx.spool, 2, TS_2049_12_13, "pebbles", "the future");

    assert_eq!(drain_and_publish(&fx), Drained::Published);

    // Both same-day entries in the closed day's file, in sequence order.
    assert_eq!(
        fs::read_to_string(fx.repo.join("2021/06-04.txt")).unwrap(),
        format!(
            "{}\nfred\nmorning\n\n{}\nwilma\nafternoon\n\n",
            TS_2021_06_04,
            TS_2021_06_04 + 60
        )
    );
    // The rollover entry opened the new day.
    assert_eq!(
        fs::read_to_string(fx.repo.join("2049/12-13.txt")).unwrap(),
        format!("{}\npebbles\nthe future\n\n", TS_2049_12_13)
    );
    assert_eq!(
        fs::read_link(fx.repo.join(NOW_LINK)).unwrap(),
        PathBuf::from("2049/12-13.txt")
    );
    assert!(spool_is_empty(&fx.spool));

    // master gained exactly the closed day's commit.
    assert_eq!(
        branch_messages(&fx.repo, "origin/master"),
        vec!["2021/06-04.txt", "seed"]
    );
    // live carries exactly one live-update commit on top of it.
    assert_eq!(
        branch_messages(&fx.repo, "origin/live"),
        vec!["live update", "2021/06-04.txt", "seed"]
    );
    // The now link is never part of master.
    let tracked = run_stdout(&fx.repo, &["ls-tree", "--name-only", "origin/master"]).unwrap();
    assert!(!tracked.lines().any(|l| l == NOW_LINK));
}

#[test]
fn past_dated_entry_is_appended_to_the_open_day() {
    let fx = fixture();
    seed_entry(&fx.spool, 0, TS_2021_06_04, "fred", "today");
    assert_eq!(drain_and_publish(&fx), Drained::Published);

    // A later entry claims 1970; ordering wins over the stamp.
    seed_entry(&fx.spool, 5, 10, "barney", "blast from the past");
    assert_eq!(drain_and_publish(&fx), Drained::Published);

    assert_eq!(
        fs::read_to_string(fx.repo.join("2021/06-04.txt")).unwrap(),
        format!(
            "{}\nfred\ntoday\n\n10\nbarney\nblast from the past\n\n",
            TS_2021_06_04
        )
    );
    assert!(!fx.repo.join("1970").exists());
    assert_eq!(
        fs::read_link(fx.repo.join(NOW_LINK)).unwrap(),
        PathBuf::from("2021/06-04.txt")
    );
    assert_eq!(
        branch_messages(&fx.repo, "origin/live"),
        vec!["live update", "live update", "seed"]
    );
}

#[test]
fn successive_days_each_get_one_master_commit() {
    let fx = fixture();

    seed_entry(&fx.spool, 0, TS_2021_06_04, "fred", "day one");
    drain_and_publish(&fx);

    seed_entry(&fx.spool, 1, TS_2021_06_04 + 86_400, "fred", "day two");
    drain_and_publish(&fx);

    seed_entry(&fx.spool, 2, TS_2021_06_04 + 2 * 86_400, "fred", "day three");
    drain_and_publish(&fx);

    assert_eq!(
        branch_messages(&fx.repo, "origin/master"),
        vec!["2021/06-05.txt", "2021/06-04.txt", "seed"]
    );
    assert_eq!(
        fs::read_link(fx.repo.join(NOW_LINK)).unwrap(),
        PathBuf::from("2021/06-06.txt")
    );
    // Only the open day is still uncommitted to master.
    let tracked = run_stdout(&fx.repo, &["ls-tree", "-r", "--name-only", "origin/master"]).unwrap();
    let tracked: Vec<_> = tracked.lines().collect();
    assert!(tracked.contains(&"2021/06-04.txt"));
    assert!(tracked.contains(&"2021/06-05.txt"));
    assert!(!tracked.contains(&"2021/06-06.txt"));
}

#[test]
fn restart_between_drains_resumes_cleanly() {
    let fx = fixture();
    seed_entry(&fx.spool, 0, TS_2021_06_04, "fred", "before restart");
    drain_and_publish(&fx);

    // A fresh Router models a restarted publisher recovering all state
    // from the repository and the now link.
    seed_entry(&fx.spool, 1, TS_2021_06_04 + 1, "fred", "after restart");
    assert_eq!(drain_and_publish(&fx), Drained::Published);

    assert_eq!(
        fs::read_to_string(fx.repo.join("2021/06-04.txt")).unwrap(),
        format!(
            "{0}\nfred\nbefore restart\n\n{1}\nfred\nafter restart\n\n",
            TS_2021_06_04,
            TS_2021_06_04 + 1
        )
    );
}
