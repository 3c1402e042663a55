//! JSON backend bound to `serde_json::Value` trees.
//!
//! [`JsonWriter`] mutates a value in place, turning it into an object as
//! soon as the first member is written. [`JsonReader`] borrows a value and
//! applies the same conversion policy as the binary reader, with JSON
//! integers and reals both treated as numeric.
//!
//! Object member order is insertion order (`serde_json` is built with
//! `preserve_order`), which keeps iteration consistent across backends.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::array::ArrayAdapter;
use crate::error::Result;
use crate::name::Name;
use crate::serializer::Serializer;

static NULL: Value = Value::Null;

/// Load a JSON document from a file.
pub fn load(path: impl AsRef<Path>) -> Result<Value> {
    let input = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(input)?)
}

/// Save a JSON document to a file.
pub fn save(path: impl AsRef<Path>, value: &Value) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()?;
    Ok(())
}

/// Writes members into a JSON value.
pub struct JsonWriter<'a> {
    value: &'a mut Value,
}

impl<'a> JsonWriter<'a> {
    pub fn new(value: &'a mut Value) -> JsonWriter<'a> {
        JsonWriter { value }
    }

    /// Mutable access to the child `name`, making the bound node an object
    /// first when it is not one.
    fn member(&mut self, name: Name<'_>) -> &mut Value {
        if !self.value.is_object() {
            *self.value = Value::Object(Map::new());
        }
        self.value
            .as_object_mut()
            .expect("node was just made an object")
            .entry(name.as_str())
            .or_insert(Value::Null)
    }

    fn lookup(&self, name: Name<'_>) -> &Value {
        self.value
            .as_object()
            .and_then(|map| map.get(name.as_str()))
            .unwrap_or(&NULL)
    }
}

impl<'a, 'doc> Serializer<'doc> for JsonWriter<'a> {
    fn is_reader(&self) -> bool {
        false
    }

    fn has_member(&self, name: Name<'_>) -> bool {
        !self.lookup(name).is_null()
    }

    fn int32(&mut self, name: Name<'_>, slot: &mut i32) {
        *self.member(name) = Value::from(*slot);
    }

    fn uint32(&mut self, name: Name<'_>, slot: &mut u32) {
        *self.member(name) = Value::from(*slot);
    }

    fn float32(&mut self, name: Name<'_>, slot: &mut f32) {
        *self.member(name) = Value::from(*slot);
    }

    fn boolean(&mut self, name: Name<'_>, slot: &mut bool) {
        *self.member(name) = Value::from(*slot);
    }

    fn string<'x>(&mut self, name: Name<'_>, slot: &mut Option<&'x str>)
    where
        'doc: 'x,
    {
        let value = slot.expect("writing a string requires the slot to hold a value");
        *self.member(name) = Value::from(value);
    }

    fn object(&mut self, name: Name<'_>, body: &mut dyn FnMut(&mut dyn Serializer<'doc>)) {
        let mut child = Value::Null;
        {
            let mut sub = JsonWriter { value: &mut child };
            body(&mut sub);
        }
        // A body that wrote nothing leaves the child null: elide it.
        if !child.is_null() {
            *self.member(name) = child;
        }
    }

    fn iterate(&mut self, visit: &mut dyn FnMut(&mut dyn Serializer<'doc>, Name<'_>) -> bool) {
        let Some(map) = self.value.as_object() else {
            return;
        };
        let keys: Vec<String> = map.keys().cloned().collect();
        for key in &keys {
            if !visit(self, Name::new(key)) {
                break;
            }
        }
    }

    fn int32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<i32>) {
        *self.member(name) = collect_array(array, Value::from);
    }

    fn uint32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<u32>) {
        *self.member(name) = collect_array(array, Value::from);
    }

    fn float32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<f32>) {
        *self.member(name) = collect_array(array, Value::from);
    }

    fn bool_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<bool>) {
        *self.member(name) = collect_array(array, Value::from);
    }

    fn string_array<'x>(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<Name<'x>>)
    where
        'doc: 'x,
    {
        *self.member(name) = collect_array(array, |item| Value::from(item.as_str()));
    }

    fn write_object_array(
        &mut self,
        name: Name<'_>,
        len: usize,
        each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    ) {
        let mut items = vec![Value::Null; len];
        for (index, item) in items.iter_mut().enumerate() {
            let mut sub = JsonWriter { value: item };
            each(&mut sub, index);
        }
        // Slots whose body wrote nothing stay null.
        *self.member(name) = Value::Array(items);
    }

    fn read_object_array_len(&mut self, _name: Name<'_>) -> usize {
        panic!("read_object_array_len is a reader operation, this serializer is a writer");
    }

    fn read_object_array(
        &mut self,
        _name: Name<'_>,
        _each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    ) {
        panic!("read_object_array is a reader operation, this serializer is a writer");
    }
}

/// Reads members out of a JSON value.
#[derive(Clone, Copy)]
pub struct JsonReader<'doc> {
    value: &'doc Value,
}

impl<'doc> JsonReader<'doc> {
    pub fn new(value: &'doc Value) -> JsonReader<'doc> {
        JsonReader { value }
    }

    /// The child `name`, or the shared null sentinel when the bound node is
    /// not an object or has no such member.
    fn member(&self, name: Name<'_>) -> &'doc Value {
        self.value
            .as_object()
            .and_then(|map| map.get(name.as_str()))
            .unwrap_or(&NULL)
    }
}

impl<'doc> Serializer<'doc> for JsonReader<'doc> {
    fn is_reader(&self) -> bool {
        true
    }

    fn has_member(&self, name: Name<'_>) -> bool {
        !self.member(name).is_null()
    }

    fn int32(&mut self, name: Name<'_>, slot: &mut i32) {
        if let Some(v) = to_i32(self.member(name)) {
            *slot = v;
        }
    }

    fn uint32(&mut self, name: Name<'_>, slot: &mut u32) {
        if let Some(v) = to_u32(self.member(name)) {
            *slot = v;
        }
    }

    fn float32(&mut self, name: Name<'_>, slot: &mut f32) {
        if let Some(v) = to_f32(self.member(name)) {
            *slot = v;
        }
    }

    fn boolean(&mut self, name: Name<'_>, slot: &mut bool) {
        if let Some(v) = to_bool(self.member(name)) {
            *slot = v;
        }
    }

    fn string<'x>(&mut self, name: Name<'_>, slot: &mut Option<&'x str>)
    where
        'doc: 'x,
    {
        if let Some(text) = self.member(name).as_str() {
            *slot = Some(text);
        }
    }

    fn object(&mut self, name: Name<'_>, body: &mut dyn FnMut(&mut dyn Serializer<'doc>)) {
        let child = self.member(name);
        if !child.is_null() {
            let mut sub = JsonReader { value: child };
            body(&mut sub);
        }
    }

    fn iterate(&mut self, visit: &mut dyn FnMut(&mut dyn Serializer<'doc>, Name<'_>) -> bool) {
        let value = self.value;
        let Some(map) = value.as_object() else {
            return;
        };
        for key in map.keys() {
            if !visit(self, Name::new(key.as_str())) {
                break;
            }
        }
    }

    fn int32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<i32>) {
        read_array(self.member(name), array, to_i32);
    }

    fn uint32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<u32>) {
        read_array(self.member(name), array, to_u32);
    }

    fn float32_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<f32>) {
        read_array(self.member(name), array, to_f32);
    }

    fn bool_array(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<bool>) {
        read_array(self.member(name), array, to_bool);
    }

    fn string_array<'x>(&mut self, name: Name<'_>, array: &mut dyn ArrayAdapter<Name<'x>>)
    where
        'doc: 'x,
    {
        read_array(self.member(name), array, |v: &'doc Value| {
            v.as_str().map(Name::new)
        });
    }

    fn write_object_array(
        &mut self,
        _name: Name<'_>,
        _len: usize,
        _each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    ) {
        panic!("write_object_array is a writer operation, this serializer is a reader");
    }

    fn read_object_array_len(&mut self, name: Name<'_>) -> usize {
        self.member(name).as_array().map_or(0, Vec::len)
    }

    fn read_object_array(
        &mut self,
        name: Name<'_>,
        each: &mut dyn FnMut(&mut dyn Serializer<'doc>, usize),
    ) {
        let Some(items) = self.member(name).as_array() else {
            return;
        };
        for (index, item) in items.iter().enumerate() {
            // Null slots do not invoke the callback.
            if !item.is_null() {
                let mut sub = JsonReader { value: item };
                each(&mut sub, index);
            }
        }
    }
}

fn collect_array<T: Copy>(
    array: &mut dyn ArrayAdapter<T>,
    to_value: impl Fn(T) -> Value,
) -> Value {
    let len = array.len();
    let mut items = Vec::with_capacity(len);
    for i in 0..len {
        items.push(to_value(array.get(i)));
    }
    Value::Array(items)
}

fn read_array<'v, T: Copy>(
    value: &'v Value,
    array: &mut dyn ArrayAdapter<T>,
    convert: impl Fn(&'v Value) -> Option<T>,
) {
    if value.is_null() {
        return;
    }
    if let Some(items) = value.as_array() {
        array.resize(items.len());
        for (i, item) in items.iter().enumerate() {
            // Refused conversions leave the slot at its post-resize default.
            if let Some(v) = convert(item) {
                array.set(i, v);
            }
        }
    } else if let Some(v) = convert(value) {
        // A scalar stored where an array was requested: coerce to a
        // single-element array.
        array.resize(1);
        array.set(0, v);
    }
}

pub(crate) fn to_i32(value: &Value) -> Option<i32> {
    if let Some(b) = value.as_bool() {
        return Some(i32::from(b));
    }
    if let Some(i) = value.as_i64() {
        return Some(i as i32);
    }
    if let Some(u) = value.as_u64() {
        return Some(u as i32);
    }
    value.as_f64().map(|f| f as i32)
}

pub(crate) fn to_u32(value: &Value) -> Option<u32> {
    if let Some(b) = value.as_bool() {
        return Some(u32::from(b));
    }
    if let Some(i) = value.as_i64() {
        return Some(i as u32);
    }
    if let Some(u) = value.as_u64() {
        return Some(u as u32);
    }
    value.as_f64().map(|f| f as u32)
}

pub(crate) fn to_f32(value: &Value) -> Option<f32> {
    if let Some(b) = value.as_bool() {
        return Some(f32::from(u8::from(b)));
    }
    value.as_f64().map(|f| f as f32)
}

pub(crate) fn to_bool(value: &Value) -> Option<bool> {
    if let Some(b) = value.as_bool() {
        return Some(b);
    }
    if let Some(i) = value.as_i64() {
        return Some(i != 0);
    }
    if let Some(u) = value.as_u64() {
        return Some(u != 0);
    }
    value.as_f64().map(|f| f != 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_replaces_non_object() {
        let mut value = Value::from(17);
        {
            let mut w = JsonWriter::new(&mut value);
            let mut v = 3i32;
            w.int32(Name::new("a"), &mut v);
        }
        assert_eq!(value, serde_json::json!({ "a": 3 }));
    }

    #[test]
    fn test_empty_object_is_elided() {
        let mut value = Value::Null;
        {
            let mut w = JsonWriter::new(&mut value);
            w.object(Name::new("empty"), &mut |_| {});
        }
        assert!(value.is_null());
    }

    #[test]
    fn test_missing_member_leaves_slot() {
        let value = serde_json::json!({ "present": 1 });
        let mut r = JsonReader::new(&value);
        let mut v = 7i32;
        r.int32(Name::new("absent"), &mut v);
        assert_eq!(v, 7);
        assert!(r.has_member(Name::new("present")));
        assert!(!r.has_member(Name::new("absent")));
    }

    #[test]
    fn test_numeric_conversions() {
        let value = serde_json::json!({ "i": -3, "f": 12.4, "b": true });
        let mut r = JsonReader::new(&value);

        let mut f = 0f32;
        r.float32(Name::new("i"), &mut f);
        assert_eq!(f, -3.0);

        let mut i = 0i32;
        r.int32(Name::new("f"), &mut i);
        assert_eq!(i, 12);

        let mut b = false;
        r.boolean(Name::new("i"), &mut b);
        assert!(b);

        let mut n = 0i32;
        r.int32(Name::new("b"), &mut n);
        assert_eq!(n, 1);
    }

    #[test]
    fn test_string_refuses_numeric_slot() {
        let value = serde_json::json!({ "s": "text" });
        let mut r = JsonReader::new(&value);
        let mut v = 99i32;
        r.int32(Name::new("s"), &mut v);
        assert_eq!(v, 99);
    }

    #[test]
    fn test_object_array_null_slots_skipped() {
        let value = serde_json::json!({ "list": [{ "a": 1 }, null, { "a": 3 }] });
        let mut r = JsonReader::new(&value);
        assert_eq!(r.read_object_array_len(Name::new("list")), 3);

        let mut seen = Vec::new();
        r.read_object_array(Name::new("list"), &mut |sub, index| {
            let mut a = 0i32;
            sub.int32(Name::new("a"), &mut a);
            seen.push((index, a));
        });
        assert_eq!(seen, vec![(0, 1), (2, 3)]);
    }
}
