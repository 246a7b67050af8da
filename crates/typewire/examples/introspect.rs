// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type introspection round trip.
//!
//! Builds a structured type at runtime, ships it and a value through the
//! wire codec (with the per-connection type cache), and walks the decoded
//! result without any compile-time type knowledge.
//!
//! Usage:
//!   cargo run --example introspect

use typewire::wire::{decode_type, decode_value, encode_type, encode_value, ReadCursor, TypeStore, WriteCursor};
use typewire::{Member, TypeDef};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Describe the type at runtime.
    let def = TypeDef::structure(
        "demo:reading:1.0",
        vec![
            Member::float64("temperature")?,
            Member::float64_array("history")?,
            Member::structure(
                "alarm",
                "alarm_t",
                vec![
                    Member::int32("severity")?,
                    Member::string("message")?,
                ],
            )?,
        ],
    )?;

    // Fill in a sample.
    let sample = def.create()?;
    sample.set_field("temperature", 21.5f64)?;
    sample.set_field("history", vec![20.0f64, 20.75, 21.5])?;
    sample.set_field("alarm.severity", 1i32)?;
    sample.set_field("alarm.message", "minor high")?;

    // Sender side: type (define + cache) followed by the data.
    let dtype = def.compiled().expect("non-empty definition").clone();
    let mut tx_cache = TypeStore::new();
    let mut stream = Vec::new();
    {
        let mut w = WriteCursor::new(false, &mut stream);
        encode_type(&mut w, &dtype, &mut tx_cache)?;
        encode_value(&mut w, &sample)?;
        // a second transmission of the same type is only a cache fetch
        encode_type(&mut w, &dtype, &mut tx_cache)?;
        encode_value(&mut w, &sample)?;
    }
    println!("stream: {} bytes for two samples\n", stream.len());

    // Receiver side: no shared compiled types, only the bytes.
    let mut rx_cache = TypeStore::new();
    let mut r = ReadCursor::new(false, &stream);
    for n in 0..2 {
        let received_type = decode_type(&mut r, &mut rx_cache)?;
        let received = decode_value(&mut r, &received_type)?;
        println!("sample {n}, type id {:?}:", received.id());
        print!("{received}");
    }
    assert!(r.good());

    // Walk what changed on the sender without knowing the type.
    println!("\nchanged fields:");
    for field in sample.marked_descendants() {
        println!("  {} ({})", sample.name_of(&field)?, field.type_code());
    }
    Ok(())
}
