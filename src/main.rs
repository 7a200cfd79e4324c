use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use heapstore::buffer::BufferPool;
use heapstore::common::DEFAULT_BUFFER_POOL_SIZE;
use heapstore::storage::heap::HeapFile;
use heapstore::tuple::{DataType, Schema, TupleBuilder, Value};
use heapstore::Result;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("heapstore=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    println!("Heapstore - fixed-slot heap pages");
    println!("=================================\n");

    let db_path = "demo.dat";
    std::fs::remove_file(db_path).ok();

    let schema = Schema::builder()
        .column("name", DataType::string())
        .column("age", DataType::Int)
        .build_arc();
    let pool = Arc::new(BufferPool::new(DEFAULT_BUFFER_POOL_SIZE));
    let file = HeapFile::new(db_path, Arc::clone(&schema), Arc::clone(&pool))?;

    let people = [("sam", 25i64), ("george", 41), ("ana", 33)];
    let mut rids = Vec::new();
    for (name, age) in people {
        let tuple = TupleBuilder::new(Arc::clone(&schema))
            .value(name)
            .value(age)
            .build()?;
        let rid = file.insert_tuple(tuple)?;
        println!("Inserted ({}, {}) at {}", name, age, rid);
        rids.push(rid);
    }

    let removed = file.delete_tuple(rids[1])?;
    println!("Deleted {} from {}", removed, rids[1]);

    pool.flush_all_pages()?;
    pool.evict_clean_pages();
    println!("\nFlushed and evicted; reloading from disk:");

    let mut sum = 0;
    for tuple in file.iter() {
        let tuple = tuple?;
        if let Some(Value::Int(age)) = tuple.value_by_name("age") {
            sum += age;
        }
        if let Some(rid) = tuple.rid() {
            println!("  {} {}", rid, tuple);
        }
    }
    println!("\nSum of ages: {}", sum);

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
    Ok(())
}
