use super::*;

#[test]
fn second_acquire_on_same_key_fails_busy() {
    let _first = try_acquire("proj-a").unwrap();
    let err = try_acquire("proj-a").unwrap_err();
    assert_eq!(err.code(), crate::error::ErrorCode::Busy);
}

#[test]
fn different_keys_do_not_contend() {
    let _a = try_acquire("proj-b").unwrap();
    let _b = try_acquire("proj-c").unwrap();
}

#[test]
fn dropping_the_guard_releases_the_lock() {
    {
        let _guard = try_acquire("proj-d").unwrap();
    }
    let _reacquired = try_acquire("proj-d").unwrap();
}
