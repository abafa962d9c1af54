//! Descriptor duplication: `dup`/`dup2` extend lock ownership to the new
//! alias without touching geometry, and unlocking through one alias
//! leaves the others in place.

mod common;

use shm_range_lock::{
    do_close, do_dup, do_dup2, do_fcntl, do_init, do_open, AccessMode, CreationFlags, FcntlCmd,
    LockOwner, LockRequestBuilder, LockType,
};

#[test]
fn duplicated_descriptors_co_own_and_split_independently() {
    do_init();
    let path = common::unique_path("dup-owners");

    let lfd = do_open(
        &path,
        AccessMode::O_RDWR,
        CreationFlags::O_CREAT | CreationFlags::O_TRUNC,
        0o777,
    )
    .unwrap();

    let req = LockRequestBuilder::new()
        .type_(LockType::F_WRLCK)
        .start(3)
        .len(4)
        .build()
        .unwrap();
    do_fcntl(lfd, FcntlCmd::SetLk(&req)).unwrap();

    let pid = common::my_pid();
    let dup_a = do_dup(lfd).unwrap();
    let dup_b = do_dup2(lfd, 215).unwrap();
    assert_eq!(dup_b.fd, 215);

    {
        let file = lfd.file.lock().unwrap();
        assert_eq!(file.locks().len(), 1);
        assert_eq!(
            file.locks()[0].owners(),
            &[
                LockOwner::new(pid, lfd.fd),
                LockOwner::new(pid, dup_a.fd),
                LockOwner::new(pid, dup_b.fd),
            ]
        );
    }

    // dup2 onto the same number is a no-op returning the same alias
    let same = do_dup2(lfd, lfd.fd).unwrap();
    assert_eq!(same.fd, lfd.fd);

    // unlocking the middle byte through the original alias splits the
    // record for that alias only
    let req = LockRequestBuilder::new()
        .type_(LockType::F_UNLCK)
        .start(4)
        .len(1)
        .build()
        .unwrap();
    do_fcntl(lfd, FcntlCmd::SetLk(&req)).unwrap();

    assert_eq!(
        common::geometry(lfd.file),
        vec![
            (3, 1, LockType::F_WRLCK),
            (3, 4, LockType::F_WRLCK),
            (5, 2, LockType::F_WRLCK),
        ]
    );
    {
        let file = lfd.file.lock().unwrap();
        for lock in file.locks() {
            if lock.range().len() == 4 {
                assert_eq!(
                    lock.owners(),
                    &[LockOwner::new(pid, dup_a.fd), LockOwner::new(pid, dup_b.fd)]
                );
            } else {
                assert_eq!(lock.owners(), &[LockOwner::new(pid, lfd.fd)]);
            }
        }
    }

    do_close(lfd).unwrap();
    do_close(dup_a).unwrap();
    do_close(dup_b).unwrap();
    std::fs::remove_file(&path).unwrap();
}
