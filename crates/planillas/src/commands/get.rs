use uuid::Uuid;

use crate::commands::CmdResult;
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub fn run<B: StorageBackend>(store: &RecordStore<B>, id: &Uuid) -> Result<CmdResult> {
    let record = store.get_record(id)?;
    Ok(CmdResult::default().with_listed(vec![record]))
}
