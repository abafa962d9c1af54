//! `do_fork` semantics: the child becomes an equal co-owner of every
//! lock the parent held, geometry untouched; and once the child dies
//! without unlocking, a later request from a co-owner reclaims its
//! ownership entries.

mod common;

use shm_range_lock::{
    do_close, do_fcntl, do_fork, do_init, do_open, AccessMode, CreationFlags, FcntlCmd,
    ForkResult, LockOwner, LockRequestBuilder, LockType,
};

#[test]
fn fork_extends_ownership_and_dead_child_is_reclaimed() {
    do_init();
    let path = common::unique_path("fork-locks");

    let lfd = do_open(
        &path,
        AccessMode::O_RDWR,
        CreationFlags::O_CREAT | CreationFlags::O_TRUNC,
        0o644,
    )
    .unwrap();

    for (type_, start, len) in [
        (LockType::F_WRLCK, 0, 5),
        (LockType::F_RDLCK, 10, 0),
    ] {
        let req = LockRequestBuilder::new()
            .type_(type_)
            .start(start)
            .len(len)
            .build()
            .unwrap();
        do_fcntl(lfd, FcntlCmd::SetLk(&req)).unwrap();
    }

    let parent = common::my_pid();
    let before = common::geometry(lfd.file);

    match do_fork().unwrap() {
        ForkResult::Child => {
            // report back through the exit code; panics would be
            // swallowed by the forked harness
            let ok = (|| {
                if common::geometry(lfd.file) != before {
                    return false;
                }
                let file = lfd.file.lock().unwrap();
                let child = common::my_pid();
                file.locks().iter().all(|lock| {
                    let parent_fds: Vec<_> = lock
                        .owners()
                        .iter()
                        .filter(|o| o.pid == parent)
                        .map(|o| o.fd)
                        .collect();
                    let child_fds: Vec<_> = lock
                        .owners()
                        .iter()
                        .filter(|o| o.pid == child)
                        .map(|o| o.fd)
                        .collect();
                    parent_fds == child_fds
                })
            })();
            // exit without closing: the child's ownership entries stay
            // behind for the parent to reclaim
            std::process::exit(if ok { 0 } else { 1 });
        }
        ForkResult::Parent { child } => {
            assert_eq!(common::wait_for(child), 0, "child-side checks failed");

            // geometry is still what it was, with the dead child listed
            assert_eq!(common::geometry(lfd.file), before);
            {
                let file = lfd.file.lock().unwrap();
                assert!(file.locks()[0].owners().iter().any(|o| o.pid == child));
            }

            // re-locking the write region hits the dead co-owner and
            // reclaims it instead of blocking
            let req = LockRequestBuilder::new()
                .type_(LockType::F_WRLCK)
                .start(0)
                .len(5)
                .build()
                .unwrap();
            do_fcntl(lfd, FcntlCmd::SetLk(&req)).unwrap();

            let file = lfd.file.lock().unwrap();
            assert!(file
                .locks()
                .iter()
                .all(|l| l.owners().iter().all(|o| o.pid != child)));
            let write = file
                .locks()
                .iter()
                .find(|l| l.type_() == LockType::F_WRLCK)
                .unwrap();
            assert_eq!(write.owners(), &[LockOwner::new(parent, lfd.fd)]);
            drop(file);

            do_close(lfd).unwrap();
            std::fs::remove_file(&path).unwrap();
        }
    }
}
