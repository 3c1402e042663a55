//! Fixtures shared by the integration suites: a flat struct, a recursive
//! hierarchy, and their persist functions. Each is written once against the
//! visitor interface and drives every backend in both directions.

#![allow(dead_code)]

use slate::{
    iterate_members, name, read_object_array, serialize_object, write_object_array, Serializer,
};

#[derive(Default, Debug, PartialEq)]
pub struct Variables {
    pub a: i32,
    pub b: u32,
    pub c: f32,
    pub d: bool,
}

pub fn persist_variables(s: &mut dyn Serializer<'_>, v: &mut Variables) {
    s.uint32(name!("B"), &mut v.b);
    s.int32(name!("A"), &mut v.a);
    s.float32(name!("C"), &mut v.c);
    s.boolean(name!("D"), &mut v.d);
}

#[derive(Default, Debug, PartialEq)]
pub struct Hierarchy {
    pub a: i32,
    pub child: Option<Box<Hierarchy>>,
}

pub fn build_hierarchy(depth: i32) -> Box<Hierarchy> {
    let mut h = Box::new(Hierarchy {
        a: depth,
        child: None,
    });
    if depth > 0 {
        h.child = Some(build_hierarchy(depth - 1));
    }
    h
}

pub fn persist_hierarchy(s: &mut dyn Serializer<'_>, h: &mut Hierarchy) {
    s.int32(name!("aaa"), &mut h.a);
    serialize_object(s, name!("child"), |sub| {
        if sub.is_reader() {
            let mut child = Box::new(Hierarchy::default());
            persist_hierarchy(sub, &mut child);
            h.child = Some(child);
        } else if let Some(child) = h.child.as_deref_mut() {
            persist_hierarchy(sub, child);
        }
    });
}

pub fn persist_hierarchies(s: &mut dyn Serializer<'_>, list: &mut Vec<Option<Box<Hierarchy>>>) {
    if s.is_reader() {
        let len = s.read_object_array_len(name!("hierarchies"));
        list.clear();
        list.resize_with(len, || None);
        read_object_array(s, name!("hierarchies"), |sub, index| {
            let mut h = Box::new(Hierarchy::default());
            persist_hierarchy(sub, &mut h);
            list[index] = Some(h);
        });
    } else {
        write_object_array(s, name!("hierarchies"), list.len(), |sub, index| {
            if let Some(h) = list[index].as_deref_mut() {
                persist_hierarchy(sub, h);
            }
        });
    }
}

pub fn member_names(s: &mut dyn Serializer<'_>) -> Vec<String> {
    let mut names = Vec::new();
    iterate_members(s, |_, member| {
        names.push(member.as_str().to_owned());
        true
    });
    names
}
