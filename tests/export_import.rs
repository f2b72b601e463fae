//! Cross-thread transfer tests
//!
//! A pool instance is single-writer, so threads cooperate by moving whole
//! pools or export records through ordinary synchronization (here: channels
//! and joins). The records carry block ownership, so worker-built capacity
//! ends up serving the main thread without new global-allocator traffic.

use std::sync::mpsc;
use std::thread;

use typed_pool::{ExportRecord, PoolAllocator};

const BLOCK_SIZE: usize = 4096;

#[derive(Debug, PartialEq)]
struct Payload {
    tag: char,
    values: Vec<i32>,
}

impl Payload {
    fn sample() -> Self {
        Payload {
            tag: 'X',
            values: vec![1, 2, 3, 4, 5],
        }
    }
}

type WorkerPool = PoolAllocator<Payload, BLOCK_SIZE>;

#[test]
fn workers_export_capacity_to_main_thread() {
    const NUM_WORKERS: usize = 6;

    let (tx, rx) = mpsc::channel::<(usize, usize, ExportRecord<Payload, BLOCK_SIZE>)>();

    let mut handles = Vec::new();
    for worker in 0..NUM_WORKERS {
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            let pool = WorkerPool::new();
            // Uneven per-worker load, including an idle worker.
            let num_objects = worker * 3;

            for _ in 0..num_objects {
                let p = pool.new_object(Payload::sample()).expect("allocation failed");
                unsafe {
                    assert_eq!((*p.as_ptr()).tag, 'X');
                    assert_eq!((*p.as_ptr()).values, vec![1, 2, 3, 4, 5]);
                    // Deleting before export is fine: the slot is only
                    // marked free, the block stays with the pool.
                    pool.delete_object(p.as_ptr());
                }
            }

            let bytes = pool.allocated_bytes();
            let record = pool.export_all();
            assert_eq!(bytes, record.num_blocks() * BLOCK_SIZE);
            tx.send((num_objects, record.num_blocks(), record)).unwrap();
        }));
    }
    drop(tx);

    let main_pool = WorkerPool::new();
    let mut expected_objects = 0;
    let mut expected_blocks = 0;
    for (num_objects, num_blocks, record) in rx.iter() {
        expected_objects += num_objects;
        expected_blocks += num_blocks;
        main_pool.import(record);
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(main_pool.allocated_bytes(), expected_blocks * BLOCK_SIZE);

    // Imported capacity serves the same number of objects with no
    // additional block acquisition.
    let before = main_pool.allocated_bytes();
    let mut boxes = Vec::new();
    for _ in 0..expected_objects {
        boxes.push(main_pool.make_unique(Payload::sample()).unwrap());
    }
    assert_eq!(main_pool.allocated_bytes(), before);
}

#[test]
fn whole_pool_moves_between_threads() {
    let pool: PoolAllocator<u64, 256> = PoolAllocator::new();
    let p = pool.new_object(11).unwrap();
    unsafe { pool.delete_object(p.as_ptr()) };
    let bytes = pool.allocated_bytes();

    // The pool is Send: hand it to another thread wholesale.
    let pool = thread::spawn(move || {
        let q = pool.new_object(22).unwrap();
        unsafe {
            assert_eq!(*q.as_ptr(), 22);
            pool.delete_object(q.as_ptr());
        }
        pool
    })
    .join()
    .unwrap();

    assert_eq!(pool.allocated_bytes(), bytes);
    assert_eq!(pool.num_slots_available(), 1);
}

#[test]
fn free_slot_record_crosses_scoped_threads() {
    // transfer_free couples the record to the source pool's lifetime, so
    // scope the consumer thread inside the source's lifetime.
    let src: PoolAllocator<u64, 256> = PoolAllocator::new();

    let mut ptrs = Vec::new();
    for i in 0..10 {
        ptrs.push(src.new_object(i).unwrap());
    }
    for p in ptrs.drain(..) {
        unsafe { src.delete_object(p.as_ptr()) };
    }
    let record = src.export_free();
    assert_eq!(record.num_free_slots(), 10);
    assert_eq!(record.num_blocks(), 0);

    thread::scope(|scope| {
        scope.spawn(|| {
            let dst: PoolAllocator<u64, 256> = PoolAllocator::new();
            dst.import(record);
            assert_eq!(dst.num_slots_available(), 10);
            assert_eq!(dst.allocated_bytes(), 0);

            // Slots live in src's blocks; src outlives this scope.
            let p = dst.new_object(33).unwrap();
            unsafe {
                assert_eq!(*p.as_ptr(), 33);
                dst.delete_object(p.as_ptr());
            }
        });
    });

    // Blocks never left the source pool.
    assert_eq!(src.allocated_bytes(), 256);
    assert_eq!(src.num_slots_available(), 0);
}

#[test]
fn round_trip_returns_capacity_to_origin() {
    let main_pool: PoolAllocator<u64, 128> = PoolAllocator::new();

    // Warm up the main pool, then hand all capacity to a worker.
    let mut ptrs = Vec::new();
    for i in 0..50 {
        ptrs.push(main_pool.new_object(i).unwrap());
    }
    for p in ptrs.drain(..) {
        unsafe { main_pool.delete_object(p.as_ptr()) };
    }
    let outbound = main_pool.export_all();
    let blocks = outbound.num_blocks();
    assert_eq!(main_pool.allocated_bytes(), 0);

    let inbound = thread::spawn(move || {
        let worker: PoolAllocator<u64, 128> = PoolAllocator::new();
        worker.import(outbound);

        let p = worker.new_object(99).unwrap();
        unsafe {
            assert_eq!(*p.as_ptr(), 99);
            worker.delete_object(p.as_ptr());
        }
        worker.export_all()
    })
    .join()
    .unwrap();

    assert_eq!(inbound.num_blocks(), blocks);
    main_pool.import(inbound);
    assert_eq!(main_pool.allocated_bytes(), blocks * 128);

    // Every slot is on the free list now; the pool allocates from it alone.
    let before = main_pool.allocated_bytes();
    let mut got = Vec::new();
    for i in 0..50 {
        got.push(main_pool.new_object(i).unwrap());
    }
    assert_eq!(main_pool.allocated_bytes(), before);
    for p in got {
        unsafe { main_pool.delete_object(p.as_ptr()) };
    }
}
