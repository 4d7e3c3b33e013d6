use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

/// Store image bytes so they can be attached to a planilla.
pub fn run<B: StorageBackend>(
    store: &RecordStore<B>,
    original_name: &str,
    bytes: &[u8],
) -> Result<CmdResult> {
    let uploaded = store.store_upload(original_name, bytes)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Uploaded {} as {}",
        original_name, uploaded.filename
    )));
    result.uploads.push(uploaded);
    Ok(result)
}

pub fn remove<B: StorageBackend>(store: &RecordStore<B>, filename: &str) -> Result<CmdResult> {
    store.delete_upload(filename)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Removed {}", filename)));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanillaError;
    use crate::store::backend::StorageBackend;
    use crate::test_utils::{MemEnv, TEST_DOMAIN};

    #[test]
    fn test_upload_then_remove() {
        let env = MemEnv::new();
        let result = run(&env.store, "plano.jpeg", b"jpeg").unwrap();
        let uploaded = &result.uploads[0];
        assert!(uploaded.url.starts_with(TEST_DOMAIN));
        assert!(env.store.backend().attachment_exists(&uploaded.filename));

        remove(&env.store, &uploaded.filename).unwrap();
        assert!(!env.store.backend().attachment_exists(&uploaded.filename));
    }

    #[test]
    fn test_upload_rejects_non_images() {
        let env = MemEnv::new();
        assert!(matches!(
            run(&env.store, "script.sh", b"#!"),
            Err(PlanillaError::Validation(_))
        ));
    }
}
