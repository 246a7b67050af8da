// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire codec for value payloads.
//!
//! Once a type is known on both sides, a value travels as the preorder walk
//! of its compiled array: numerics in their fixed width under the stream
//! endianness, strings size-prefixed, arrays count-prefixed, a union as a
//! one-byte selector (0xff for no selection) plus the selected value, an
//! Any as a literal type definition plus its value, or a lone 0xff when
//! empty. Struct slots contribute no bytes of their own.
//!
//! Decoding validates every consumed byte against the declared shape and
//! fills a fresh instance; malformed input poisons the cursor and yields an
//! error, never a partial value.

use crate::error::WireError;
use crate::fielddesc::{CompiledType, FieldDesc};
use crate::storage::{ArrayData, FieldStorage, Store};
use crate::typecode::TypeCode;
use crate::value::{Instance, Value};
use crate::wire::types::{decode_type_or_null, encode_literal, TypeStore};
use crate::wire::{ReadCursor, WriteCursor};

/// Encode a value's data; its type must already be known to the peer.
pub fn encode_value(w: &mut WriteCursor<'_>, value: &Value) -> Result<(), WireError> {
    let Some(inst) = &value.inst else {
        return Err(WireError::Unencodable("invalid value"));
    };
    let guard = inst.fields.read();
    let size = inst.desc(value.index).size();
    for rel in value.index..value.index + size {
        encode_slot(w, inst.desc(rel), &guard[rel].store)?;
    }
    Ok(())
}

fn encode_slot(w: &mut WriteCursor<'_>, desc: &FieldDesc, store: &Store) -> Result<(), WireError> {
    let code = desc.code();
    if code.is_array() {
        return encode_array(w, desc, store);
    }
    match (code, store) {
        (TypeCode::STRUCT, _) => Ok(()),
        (TypeCode::BOOL, Store::Bool(b)) => {
            w.write_u8(u8::from(*b));
            Ok(())
        }
        (TypeCode::INT8, Store::Int(v)) => {
            w.write_i8(*v as i8);
            Ok(())
        }
        (TypeCode::INT16, Store::Int(v)) => {
            w.write_i16(*v as i16);
            Ok(())
        }
        (TypeCode::INT32, Store::Int(v)) => {
            w.write_i32(*v as i32);
            Ok(())
        }
        (TypeCode::INT64, Store::Int(v)) => {
            w.write_i64(*v);
            Ok(())
        }
        (TypeCode::UINT8, Store::UInt(v)) => {
            w.write_u8(*v as u8);
            Ok(())
        }
        (TypeCode::UINT16, Store::UInt(v)) => {
            w.write_u16(*v as u16);
            Ok(())
        }
        (TypeCode::UINT32, Store::UInt(v)) => {
            w.write_u32(*v as u32);
            Ok(())
        }
        (TypeCode::UINT64, Store::UInt(v)) => {
            w.write_u64(*v);
            Ok(())
        }
        (TypeCode::FLOAT32, Store::Real(v)) => {
            w.write_f32(*v as f32);
            Ok(())
        }
        (TypeCode::FLOAT64, Store::Real(v)) => {
            w.write_f64(*v);
            Ok(())
        }
        (TypeCode::STRING, Store::String(s)) => {
            w.write_string(s);
            Ok(())
        }
        (TypeCode::UNION, Store::Compound(selected)) => encode_union(w, desc, selected),
        (TypeCode::ANY, Store::Compound(contained)) => encode_any(w, contained),
        _ => Err(WireError::Unencodable("storage tag mismatch")),
    }
}

fn encode_union(
    w: &mut WriteCursor<'_>,
    desc: &FieldDesc,
    selected: &Value,
) -> Result<(), WireError> {
    let Some(sel_inst) = &selected.inst else {
        w.write_u8(0xff);
        return Ok(());
    };
    let members = desc
        .members()
        .ok_or(WireError::Unencodable("union without alternatives"))?;
    if desc.member_count() >= 0xff {
        return Err(WireError::Unencodable("union with more than 254 alternatives"));
    }
    let selector = desc
        .member_names()
        .position(|(_, alt)| {
            sel_inst.dtype.same_as(members) && sel_inst.base == alt && selected.index == 0
        })
        .ok_or(WireError::Unencodable("union selection aliases a foreign type"))?;
    w.write_u8(selector as u8);
    encode_value(w, selected)
}

fn encode_any(w: &mut WriteCursor<'_>, contained: &Value) -> Result<(), WireError> {
    let Some(inst) = &contained.inst else {
        w.write_u8(0xff);
        return Ok(());
    };
    encode_literal(w, inst.dtype.defs(), inst.base + contained.index)?;
    encode_value(w, contained)
}

fn encode_array(
    w: &mut WriteCursor<'_>,
    desc: &FieldDesc,
    store: &Store,
) -> Result<(), WireError> {
    let Store::Array(data) = store else {
        return Err(WireError::Unencodable("storage tag mismatch"));
    };
    w.write_size(data.len());
    match data {
        ArrayData::Bool(v) => {
            for b in v {
                w.write_u8(u8::from(*b));
            }
        }
        ArrayData::Int8(v) => {
            for x in v {
                w.write_i8(*x);
            }
        }
        ArrayData::Int16(v) => {
            for x in v {
                w.write_i16(*x);
            }
        }
        ArrayData::Int32(v) => {
            for x in v {
                w.write_i32(*x);
            }
        }
        ArrayData::Int64(v) => {
            for x in v {
                w.write_i64(*x);
            }
        }
        ArrayData::UInt8(v) => w.write_bytes(v),
        ArrayData::UInt16(v) => {
            for x in v {
                w.write_u16(*x);
            }
        }
        ArrayData::UInt32(v) => {
            for x in v {
                w.write_u32(*x);
            }
        }
        ArrayData::UInt64(v) => {
            for x in v {
                w.write_u64(*x);
            }
        }
        ArrayData::Float32(v) => {
            for x in v {
                w.write_f32(*x);
            }
        }
        ArrayData::Float64(v) => {
            for x in v {
                w.write_f64(*x);
            }
        }
        ArrayData::String(v) => {
            for s in v {
                w.write_string(s);
            }
        }
        ArrayData::Values(elems) => match desc.code() {
            TypeCode::STRUCT_ARRAY | TypeCode::UNION_ARRAY => {
                for elem in elems {
                    if !elem.is_valid() {
                        return Err(WireError::Unencodable("absent compound array element"));
                    }
                    encode_value(w, elem)?;
                }
            }
            TypeCode::ANY_ARRAY => {
                for elem in elems {
                    encode_any(w, elem)?;
                }
            }
            _ => return Err(WireError::Unencodable("storage tag mismatch")),
        },
    }
    Ok(())
}

/// Decode a value of a known compiled type into a fresh instance.
pub fn decode_value(
    r: &mut ReadCursor<'_>,
    dtype: &CompiledType,
) -> Result<Value, WireError> {
    let value = Value::instantiate(dtype.clone());
    {
        let Some(inst) = &value.inst else {
            return Err(WireError::Unencodable("invalid value"));
        };
        let mut guard = inst.fields.write();
        let size = inst.desc(0).size();
        for rel in 0..size {
            decode_slot(r, inst, rel, &mut guard[rel])?;
        }
    }
    if r.good() {
        Ok(value)
    } else {
        Err(WireError::Truncated)
    }
}

fn decode_slot(
    r: &mut ReadCursor<'_>,
    inst: &Instance,
    rel: usize,
    slot: &mut FieldStorage,
) -> Result<(), WireError> {
    let desc = inst.desc(rel);
    let code = desc.code();
    if code.is_array() {
        return decode_array(r, desc, slot);
    }
    match code {
        TypeCode::STRUCT => Ok(()),
        TypeCode::BOOL => {
            slot.store = Store::Bool(r.read_u8() != 0);
            ok_unless_bad(r)
        }
        TypeCode::INT8 => {
            slot.store = Store::Int(i64::from(r.read_i8()));
            ok_unless_bad(r)
        }
        TypeCode::INT16 => {
            slot.store = Store::Int(i64::from(r.read_i16()));
            ok_unless_bad(r)
        }
        TypeCode::INT32 => {
            slot.store = Store::Int(i64::from(r.read_i32()));
            ok_unless_bad(r)
        }
        TypeCode::INT64 => {
            slot.store = Store::Int(r.read_i64());
            ok_unless_bad(r)
        }
        TypeCode::UINT8 => {
            slot.store = Store::UInt(u64::from(r.read_u8()));
            ok_unless_bad(r)
        }
        TypeCode::UINT16 => {
            slot.store = Store::UInt(u64::from(r.read_u16()));
            ok_unless_bad(r)
        }
        TypeCode::UINT32 => {
            slot.store = Store::UInt(u64::from(r.read_u32()));
            ok_unless_bad(r)
        }
        TypeCode::UINT64 => {
            slot.store = Store::UInt(r.read_u64());
            ok_unless_bad(r)
        }
        TypeCode::FLOAT32 => {
            slot.store = Store::Real(f64::from(r.read_f32()));
            ok_unless_bad(r)
        }
        TypeCode::FLOAT64 => {
            slot.store = Store::Real(r.read_f64());
            ok_unless_bad(r)
        }
        TypeCode::STRING => {
            slot.store = Store::String(r.read_string());
            ok_unless_bad(r)
        }
        TypeCode::UNION => {
            slot.store = Store::Compound(decode_union(r, desc)?);
            Ok(())
        }
        TypeCode::ANY => {
            slot.store = Store::Compound(decode_any(r)?);
            Ok(())
        }
        _ => {
            r.fail();
            Err(WireError::BadOpcode(code.raw()))
        }
    }
}

fn ok_unless_bad(r: &ReadCursor<'_>) -> Result<(), WireError> {
    if r.good() {
        Ok(())
    } else {
        Err(WireError::Truncated)
    }
}

fn decode_union(r: &mut ReadCursor<'_>, desc: &FieldDesc) -> Result<Value, WireError> {
    let selector = r.read_u8();
    if !r.good() {
        return Err(WireError::Truncated);
    }
    if selector == 0xff {
        return Ok(Value::default());
    }
    let alternatives = desc.member_count();
    if usize::from(selector) >= alternatives {
        r.fail();
        return Err(WireError::BadSelector {
            selector,
            alternatives,
        });
    }
    let alt = desc.miter[usize::from(selector)].1;
    let members = desc
        .members()
        .ok_or(WireError::Truncated)?
        .clone();
    let selected = Value::instantiate_at(members, alt);
    decode_into(r, &selected)?;
    Ok(selected)
}

fn decode_any(r: &mut ReadCursor<'_>) -> Result<Value, WireError> {
    // an Any carries its own literal definition; cache opcodes are accepted
    // but scoped to this field
    let mut scratch = TypeStore::new();
    match decode_type_or_null(r, &mut scratch)? {
        None => Ok(Value::default()),
        Some(dtype) => decode_value(r, &dtype),
    }
}

fn decode_into(r: &mut ReadCursor<'_>, value: &Value) -> Result<(), WireError> {
    let Some(inst) = &value.inst else {
        return Err(WireError::Unencodable("invalid value"));
    };
    let mut guard = inst.fields.write();
    let size = inst.desc(value.index).size();
    for rel in value.index..value.index + size {
        decode_slot(r, inst, rel, &mut guard[rel])?;
    }
    Ok(())
}

fn decode_array(
    r: &mut ReadCursor<'_>,
    desc: &FieldDesc,
    slot: &mut FieldStorage,
) -> Result<(), WireError> {
    let count = r.read_size();
    if !r.good() {
        return Err(WireError::Truncated);
    }
    let code = desc.code();
    let elem_width = match code.scalar_of() {
        TypeCode::BOOL => 1,
        c if c.kind() == crate::typecode::Kind::Integer
            || c.kind() == crate::typecode::Kind::Real =>
        {
            c.size()
        }
        _ => 1, // strings and compounds need at least one byte each
    };
    if count.saturating_mul(elem_width) > r.remaining() {
        r.fail();
        return Err(WireError::Truncated);
    }

    macro_rules! read_elems {
        ($variant:ident, $read:ident, $conv:expr) => {{
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                let raw = r.$read();
                out.push($conv(raw));
            }
            ArrayData::$variant(out)
        }};
    }

    let data = match code.scalar_of() {
        TypeCode::BOOL => read_elems!(Bool, read_u8, |b| b != 0),
        TypeCode::INT8 => read_elems!(Int8, read_i8, |x| x),
        TypeCode::INT16 => read_elems!(Int16, read_i16, |x| x),
        TypeCode::INT32 => read_elems!(Int32, read_i32, |x| x),
        TypeCode::INT64 => read_elems!(Int64, read_i64, |x| x),
        TypeCode::UINT8 => ArrayData::UInt8(r.read_bytes(count).to_vec()),
        TypeCode::UINT16 => read_elems!(UInt16, read_u16, |x| x),
        TypeCode::UINT32 => read_elems!(UInt32, read_u32, |x| x),
        TypeCode::UINT64 => read_elems!(UInt64, read_u64, |x| x),
        TypeCode::FLOAT32 => read_elems!(Float32, read_f32, |x| x),
        TypeCode::FLOAT64 => read_elems!(Float64, read_f64, |x| x),
        TypeCode::STRING => {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(r.read_string());
                if !r.good() {
                    return Err(WireError::Truncated);
                }
            }
            ArrayData::String(out)
        }
        TypeCode::STRUCT | TypeCode::UNION => {
            let members = desc.members().ok_or(WireError::Truncated)?;
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                let elem = Value::instantiate_at(members.clone(), 0);
                decode_into(r, &elem)?;
                out.push(elem);
            }
            ArrayData::Values(out)
        }
        TypeCode::ANY => {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(decode_any(r)?);
            }
            ArrayData::Values(out)
        }
        other => {
            r.fail();
            return Err(WireError::BadOpcode(other.raw()));
        }
    };
    if !r.good() {
        return Err(WireError::Truncated);
    }
    slot.store = Store::Array(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Member;
    use crate::typedef::TypeDef;

    fn round_trip(value: &Value, big_endian: bool) -> Value {
        let mut buf = Vec::new();
        encode_value(&mut WriteCursor::new(big_endian, &mut buf), value).expect("encode");
        let dtype = value
            .inst
            .as_ref()
            .map(|i| i.dtype.clone())
            .expect("compiled type");
        let mut r = ReadCursor::new(big_endian, &buf);
        let decoded = decode_value(&mut r, &dtype).expect("decode");
        assert!(r.good());
        assert_eq!(r.remaining(), 0, "trailing bytes after decode");
        decoded
    }

    #[test]
    fn scalar_payload_round_trip() {
        let def = TypeDef::structure(
            "sample_t",
            vec![
                Member::bool_field("flag").expect("member"),
                Member::int8("tiny").expect("member"),
                Member::int64("big").expect("member"),
                Member::uint16("mid").expect("member"),
                Member::float32("ratio").expect("member"),
                Member::float64("level").expect("member"),
                Member::string("label").expect("member"),
            ],
        )
        .expect("typedef");
        let val = def.create().expect("create");
        val.set_field("flag", true).expect("set");
        val.set_field("tiny", -5i8).expect("set");
        val.set_field("big", -1_234_567_890_123i64).expect("set");
        val.set_field("mid", 40_000u16).expect("set");
        val.set_field("ratio", 0.5f32).expect("set");
        val.set_field("level", -2.25f64).expect("set");
        val.set_field("label", "calibrated").expect("set");

        for be in [false, true] {
            let out = round_trip(&val, be);
            assert!(out.get_field::<bool>("flag").expect("get"));
            assert_eq!(out.get_field::<i8>("tiny").expect("get"), -5);
            assert_eq!(
                out.get_field::<i64>("big").expect("get"),
                -1_234_567_890_123
            );
            assert_eq!(out.get_field::<u16>("mid").expect("get"), 40_000);
            assert_eq!(out.get_field::<f32>("ratio").expect("get"), 0.5);
            assert_eq!(out.get_field::<f64>("level").expect("get"), -2.25);
            assert_eq!(
                out.get_field::<String>("label").expect("get"),
                "calibrated"
            );
            assert!(!out.is_marked(false, true));
        }
    }

    #[test]
    fn fixed_widths_on_the_wire() {
        let def = TypeDef::structure(
            "w_t",
            vec![
                Member::int64("secondsPastEpoch").expect("member"),
                Member::int32("nanoSeconds").expect("member"),
            ],
        )
        .expect("typedef");
        let val = def.create().expect("create");
        val.set_field("secondsPastEpoch", 0x0102_0304_0506_0708i64)
            .expect("set");
        val.set_field("nanoSeconds", 0x0a0b_0c0di32).expect("set");

        let mut buf = Vec::new();
        encode_value(&mut WriteCursor::new(true, &mut buf), &val).expect("encode");
        assert_eq!(
            buf,
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x0a, 0x0b, 0x0c, 0x0d]
        );
    }

    #[test]
    fn union_selector_round_trip() {
        let def = TypeDef::structure(
            "holder_t",
            vec![Member::union_of(
                "value",
                "",
                vec![
                    Member::int32("ival").expect("member"),
                    Member::string("sval").expect("member"),
                ],
            )
            .expect("member")],
        )
        .expect("typedef");

        // unselected union travels as a single 0xff
        let empty = def.create().expect("create");
        let mut buf = Vec::new();
        encode_value(&mut WriteCursor::new(true, &mut buf), &empty).expect("encode");
        assert_eq!(buf, [0xff]);
        let out = round_trip(&empty, true);
        assert!(out.field("value->ival").is_none());

        let val = def.create().expect("create");
        val.select("value->sval")
            .expect("select")
            .set("chosen")
            .expect("set");
        let mut buf = Vec::new();
        encode_value(&mut WriteCursor::new(true, &mut buf), &val).expect("encode");
        assert_eq!(buf[0], 1, "declaration-order selector");
        let out = round_trip(&val, true);
        assert_eq!(
            out.get_field::<String>("value->sval").expect("get"),
            "chosen"
        );
        assert!(out.field("value->ival").is_none());
    }

    #[test]
    fn bad_union_selector_is_a_decode_error() {
        let def = TypeDef::structure(
            "holder_t",
            vec![Member::union_of(
                "value",
                "",
                vec![Member::int32("ival").expect("member")],
            )
            .expect("member")],
        )
        .expect("typedef");
        let dtype = def.compiled().expect("compiled").clone();
        let mut r = ReadCursor::new(true, &[0x05]);
        let err = decode_value(&mut r, &dtype).unwrap_err();
        assert_eq!(
            err,
            WireError::BadSelector {
                selector: 5,
                alternatives: 1
            }
        );
        assert!(!r.good());
    }

    #[test]
    fn arrays_round_trip() {
        let def = TypeDef::structure(
            "arr_t",
            vec![
                Member::float64_array("wave").expect("member"),
                Member::uint8_array("raw").expect("member"),
                Member::string_array("tags").expect("member"),
            ],
        )
        .expect("typedef");
        let val = def.create().expect("create");
        val.set_field("wave", vec![1.5f64, -2.5, 0.0]).expect("set");
        val.set_field("raw", vec![1u8, 2, 3, 255]).expect("set");
        val.set_field("tags", vec!["a".to_string(), "bc".to_string()])
            .expect("set");

        for be in [false, true] {
            let out = round_trip(&val, be);
            assert_eq!(
                out.get_field::<Vec<f64>>("wave").expect("get"),
                vec![1.5, -2.5, 0.0]
            );
            assert_eq!(
                out.get_field::<Vec<u8>>("raw").expect("get"),
                vec![1, 2, 3, 255]
            );
            assert_eq!(
                out.get_field::<Vec<String>>("tags").expect("get"),
                vec!["a".to_string(), "bc".to_string()]
            );
        }
    }

    #[test]
    fn struct_array_round_trip() {
        let def = TypeDef::structure(
            "frame_t",
            vec![Member::struct_array(
                "dimension",
                "dimension_t",
                vec![
                    Member::int32("size").expect("member"),
                    Member::bool_field("reverse").expect("member"),
                ],
            )
            .expect("member")],
        )
        .expect("typedef");
        let val = def.create().expect("create");
        let dims = val.field("dimension").expect("field");
        let a = dims.alloc_member().expect("alloc");
        a.set_field("size", 640i32).expect("set");
        let b = dims.alloc_member().expect("alloc");
        b.set_field("size", 480i32).expect("set");
        b.set_field("reverse", true).expect("set");
        dims.set(vec![a, b]).expect("set");

        let out = round_trip(&val, false);
        assert_eq!(out.get_field::<i32>("dimension[0]size").expect("get"), 640);
        assert_eq!(out.get_field::<i32>("dimension[1]size").expect("get"), 480);
        assert!(out.get_field::<bool>("dimension[1]reverse").expect("get"));
    }

    #[test]
    fn any_round_trip() {
        let def = TypeDef::structure(
            "box_t",
            vec![Member::any("payload").expect("member")],
        )
        .expect("typedef");

        // empty Any is a single null tag
        let empty = def.create().expect("create");
        let mut buf = Vec::new();
        encode_value(&mut WriteCursor::new(false, &mut buf), &empty).expect("encode");
        assert_eq!(buf, [0xff]);
        let out = round_trip(&empty, false);
        assert!(!out
            .field("payload")
            .expect("field")
            .get::<Value>()
            .expect("get")
            .is_valid());

        // populated Any carries its own definition
        let val = def.create().expect("create");
        let inner = TypeDef::structure("point_t", vec![Member::int32("x").expect("member")])
            .expect("typedef")
            .create()
            .expect("create");
        inner.set_field("x", 9i32).expect("set");
        val.field("payload").expect("field").set(inner).expect("set");
        let out = round_trip(&val, false);
        assert_eq!(out.get_field::<i32>("payload.x").expect("get"), 9);
        assert_eq!(out.field("payload").expect("field").get::<Value>().expect("get").id(), "point_t");
    }

    #[test]
    fn truncated_payload_fails() {
        let def = TypeDef::structure(
            "w_t",
            vec![Member::int64("secondsPastEpoch").expect("member")],
        )
        .expect("typedef");
        let dtype = def.compiled().expect("compiled").clone();
        let mut r = ReadCursor::new(true, &[0x01, 0x02, 0x03]);
        assert_eq!(decode_value(&mut r, &dtype).unwrap_err(), WireError::Truncated);
        assert!(!r.good());
    }

    #[test]
    fn hostile_array_count_fails_fast() {
        let def = TypeDef::structure(
            "arr_t",
            vec![Member::float64_array("wave").expect("member")],
        )
        .expect("typedef");
        let dtype = def.compiled().expect("compiled").clone();
        // claims 2^31 elements with four bytes of payload
        let msg = [0xfe, 0x80, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04];
        let mut r = ReadCursor::new(true, &msg);
        assert_eq!(decode_value(&mut r, &dtype).unwrap_err(), WireError::Truncated);
        assert!(!r.good());
    }
}
