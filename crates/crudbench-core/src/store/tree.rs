//! sled helpers shared by the document and key-value backends.

use sled::transaction::{abort, TransactionError};
use sled::Tree;
use tracing::debug;

use crate::error::Error;

/// Insert every entry in one transaction, failing if any key already exists.
pub(crate) fn insert_unique(tree: &Tree, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<(), Error> {
    let result = tree.transaction(|tx| {
        for (key, value) in entries {
            if tx.get(key.as_slice())?.is_some() {
                return abort(Error::Write(format!(
                    "identity collision on key {:?}",
                    String::from_utf8_lossy(key)
                )));
            }
            tx.insert(key.as_slice(), value.as_slice())?;
        }
        Ok(())
    });

    result.map_err(|e| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => Error::Storage(e),
    })
}

/// Atomically add `delta` to the counter stored at `key`.
///
/// Uses a compare-and-swap loop, so a concurrent writer can only make this
/// retry, never lose an increment. An absent counter starts from `seed()`,
/// which is called at most once.
pub(crate) fn increment(
    tree: &Tree,
    key: &[u8],
    delta: u64,
    seed: &mut dyn FnMut() -> Result<u64, Error>,
    decode: impl Fn(&[u8]) -> Result<u64, Error>,
    encode: impl Fn(u64) -> Result<Vec<u8>, Error>,
) -> Result<u64, Error> {
    let mut floor = None;

    loop {
        let current = tree.get(key)?;
        let value = match &current {
            Some(bytes) => decode(bytes)?,
            None => match floor {
                Some(floor) => floor,
                None => {
                    let seeded = seed()?;
                    debug!(floor = seeded, "seeding counter");
                    floor = Some(seeded);
                    seeded
                }
            },
        };

        let next = value + delta;
        if tree.compare_and_swap(key, current, Some(encode(next)?))?.is_ok() {
            return Ok(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (sled::Db, Tree) {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let tree = db.open_tree("test").unwrap();
        (db, tree)
    }

    fn decode(bytes: &[u8]) -> Result<u64, Error> {
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn encode(value: u64) -> Result<Vec<u8>, Error> {
        Ok(value.to_be_bytes().to_vec())
    }

    #[test]
    fn test_insert_unique_rejects_existing_key() {
        let (_db, tree) = tree();
        insert_unique(&tree, &[(b"a".to_vec(), b"1".to_vec())]).unwrap();

        let err = insert_unique(
            &tree,
            &[(b"b".to_vec(), b"2".to_vec()), (b"a".to_vec(), b"3".to_vec())],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Write(_)));

        // Aborted transactions leave no partial writes behind
        assert!(tree.get(b"b").unwrap().is_none());
        assert_eq!(tree.get(b"a").unwrap().unwrap().as_ref(), b"1");
    }

    #[test]
    fn test_increment_seeds_once() {
        let (_db, tree) = tree();
        let mut calls = 0;
        let mut seed = || -> Result<u64, Error> {
            calls += 1;
            Ok(7)
        };

        assert_eq!(increment(&tree, b"seq", 2, &mut seed, decode, encode).unwrap(), 9);
        assert_eq!(increment(&tree, b"seq", 1, &mut seed, decode, encode).unwrap(), 10);
        assert_eq!(calls, 1);
    }
}
