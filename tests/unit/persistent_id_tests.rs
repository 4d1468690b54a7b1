/*!
 * Tests for persistent id allocation against inventory files
 */

use std::collections::HashSet;
use std::fs;
use std::thread;

use anyhow::Result;
use stsync::errors::AllocationError;
use stsync::subtitle::{IdInventory, PersistentIdAllocator, PersistentIdConfig};

use crate::common;

fn allocator() -> PersistentIdAllocator {
    PersistentIdAllocator::new(&PersistentIdConfig::default()).unwrap()
}

/// Ids in an inventory file, in file order
fn inventory_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_allocate_thousandSequentialCalls_shouldNeverRepeatAndAlwaysPersist() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("ids.txt");
    let allocator = allocator();
    let mut inventory = IdInventory::open(&path)?;
    let mut seen: HashSet<String> = HashSet::new();

    for _ in 0..1000 {
        let ids = allocator.allocate(&mut inventory, 1)?;
        assert_eq!(ids.len(), 1);

        let stored = inventory.read_all()?;
        for id in ids {
            assert!(stored.contains(&id), "{} missing from inventory", id);
            assert!(seen.insert(id.clone()), "{} returned twice", id);
        }
    }
    drop(inventory);

    let lines = inventory_lines(&path);
    assert_eq!(lines.len(), 1000);
    assert_eq!(lines.iter().collect::<HashSet<_>>().len(), 1000);
    Ok(())
}

#[test]
fn test_allocate_reopenedInventory_shouldAvoidEarlierIds() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested/ids.txt");
    let allocator = allocator();

    let first = allocator.allocate(&mut IdInventory::open(&path)?, 20)?;
    let second = allocator.allocate(&mut IdInventory::open(&path)?, 20)?;

    let all: HashSet<&String> = first.iter().chain(second.iter()).collect();
    assert_eq!(all.len(), 40);
    assert_eq!(inventory_lines(&path), [first, second].concat());
    Ok(())
}

#[test]
fn test_allocate_concurrentHandles_shouldSerializeOnLock() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("ids.txt");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || -> Result<Vec<String>> {
                let mut inventory = IdInventory::open(&path)?;
                Ok(allocator().allocate(&mut inventory, 50)?)
            })
        })
        .collect();

    let mut all: HashSet<String> = HashSet::new();
    for handle in handles {
        let ids = handle.join().expect("allocation thread panicked")?;
        all.extend(ids);
    }

    assert_eq!(all.len(), 200);
    assert_eq!(inventory_lines(&path).len(), 200);
    Ok(())
}

#[test]
fn test_allocate_exhaustedPool_shouldFailAndLeaveFileUnchanged() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "ids.txt", "00\n01\n10\n")?;
    let allocator = PersistentIdAllocator::new(&PersistentIdConfig {
        alphabet: "01".to_string(),
        length: 2,
        inventory_path: path.clone(),
    })?;

    let result = allocator.allocate(&mut IdInventory::open(&path)?, 2);

    assert!(matches!(
        result,
        Err(AllocationError::ExhaustedIdentifierPool {
            requested: 2,
            available: 1
        })
    ));
    assert_eq!(fs::read_to_string(&path)?, "00\n01\n10\n");
    Ok(())
}
