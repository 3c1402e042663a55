//! Backend-universal laws: every test in the `serializer_laws!` suite runs
//! against both the binary and the JSON backend and must behave the same.

mod common;

use common::*;
use slate::{iterate_members, name, put, serialize_object, Persist, Serializer};

macro_rules! serializer_laws {
    ($backend:ident, $doc:ty, $writer:path, $reader:path) => {
        mod $backend {
            use super::*;

            fn fresh() -> $doc {
                <$doc>::default()
            }

            #[test]
            fn roundtrip_scalars() {
                let mut doc = fresh();
                let mut original = Variables {
                    a: 400,
                    b: 123_456_789,
                    c: 123.456_789,
                    d: true,
                };
                {
                    let mut w = $writer(&mut doc);
                    persist_variables(&mut w, &mut original);
                }
                let mut loaded = Variables::default();
                {
                    let mut r = $reader(&doc);
                    persist_variables(&mut r, &mut loaded);
                }
                assert_eq!(original, loaded);
            }

            #[test]
            fn value_conversion_table() {
                let mut doc = fresh();
                {
                    let mut w = $writer(&mut doc);
                    put(&mut w, name!("i"), 21i32);
                    put(&mut w, name!("u"), 34u32);
                    put(&mut w, name!("f"), 12.4f32);
                    put(&mut w, name!("b"), true);
                }
                let mut r = $reader(&doc);

                let (mut u, mut f, mut b) = (0u32, 0f32, false);
                r.uint32(name!("i"), &mut u);
                r.float32(name!("i"), &mut f);
                r.boolean(name!("i"), &mut b);
                assert_eq!(u, 21);
                assert_eq!(f, 21.0);
                assert!(b);

                let (mut i, mut f, mut b) = (0i32, 0f32, false);
                r.int32(name!("u"), &mut i);
                r.float32(name!("u"), &mut f);
                r.boolean(name!("u"), &mut b);
                assert_eq!(i, 34);
                assert_eq!(f, 34.0);
                assert!(b);

                let (mut i, mut u, mut b) = (0i32, 0u32, false);
                r.int32(name!("f"), &mut i);
                r.uint32(name!("f"), &mut u);
                r.boolean(name!("f"), &mut b);
                assert_eq!(i, 12);
                assert_eq!(u, 12);
                assert!(b);

                let (mut i, mut u, mut f) = (0i32, 0u32, 0f32);
                r.int32(name!("b"), &mut i);
                r.uint32(name!("b"), &mut u);
                r.float32(name!("b"), &mut f);
                assert_eq!(i, 1);
                assert_eq!(u, 1);
                assert_eq!(f, 1.0);
            }

            #[test]
            fn missing_member_is_inert() {
                let doc = fresh();
                let mut r = $reader(&doc);

                let mut i = -12i32;
                let mut u = 45u32;
                let mut f = 3.45f32;
                let mut b = true;
                r.int32(name!("aaaaa"), &mut i);
                r.uint32(name!("aaaaa"), &mut u);
                r.float32(name!("aaaaa"), &mut f);
                r.boolean(name!("aaaaa"), &mut b);
                serialize_object(&mut r, name!("aaaaa"), |_| {
                    panic!("missing object must not invoke the body");
                });

                assert_eq!(i, -12);
                assert_eq!(u, 45);
                assert_eq!(f, 3.45);
                assert!(b);
            }

            #[test]
            fn empty_objects_are_not_saved() {
                let mut doc = fresh();
                {
                    let mut w = $writer(&mut doc);
                    serialize_object(&mut w, name!("a"), |_| {});
                }
                let mut r = $reader(&doc);
                iterate_members(&mut r, |_, _| panic!("no members expected"));
            }

            #[test]
            fn has_member_probes() {
                let mut doc = fresh();
                {
                    let mut w = $writer(&mut doc);
                    put(&mut w, name!("present"), 1i32);
                    assert!(w.has_member(name!("present")));
                    assert!(!w.has_member(name!("absent")));
                }
                let r = $reader(&doc);
                assert!(r.has_member(name!("present")));
                assert!(!r.has_member(name!("absent")));
            }

            #[test]
            fn iterate_reports_members_in_insertion_order() {
                let mut doc = fresh();
                {
                    let mut w = $writer(&mut doc);
                    let mut vars = Variables {
                        a: 1,
                        b: 3,
                        c: 0.0,
                        d: true,
                    };
                    persist_variables(&mut w, &mut vars);
                }
                let mut r = $reader(&doc);
                let mut seen = Vec::new();
                iterate_members(&mut r, |sub, member| {
                    let mut value = 0i32;
                    sub.int32(member, &mut value);
                    seen.push((member.as_str().to_owned(), value));
                    true
                });
                assert_eq!(
                    seen,
                    vec![
                        (String::from("B"), 3),
                        (String::from("A"), 1),
                        (String::from("C"), 0),
                        (String::from("D"), 1),
                    ]
                );
            }

            #[test]
            fn iterate_stops_when_callback_returns_false() {
                let mut doc = fresh();
                {
                    let mut w = $writer(&mut doc);
                    put(&mut w, name!("one"), 1i32);
                    put(&mut w, name!("two"), 2i32);
                    put(&mut w, name!("three"), 3i32);
                }
                let mut r = $reader(&doc);
                let mut seen = 0;
                iterate_members(&mut r, |_, _| {
                    seen += 1;
                    seen < 2
                });
                assert_eq!(seen, 2);
            }

            #[test]
            fn iterate_works_on_writers_and_nested_objects() {
                let mut doc = fresh();
                let mut w = $writer(&mut doc);
                put(&mut w, name!("i"), -21i32);
                assert_eq!(member_names(&mut w), ["i"]);
                put(&mut w, name!("u"), 34u32);
                put(&mut w, name!("f"), 12.4f32);
                assert_eq!(member_names(&mut w), ["i", "u", "f"]);
                serialize_object(&mut w, name!("o"), |sub| {
                    put(sub, name!("x"), 1i32);
                    assert_eq!(member_names(sub), ["x"]);
                    put(sub, name!("y"), true);
                    assert_eq!(member_names(sub), ["x", "y"]);
                });
                put(&mut w, name!("b"), true);
                assert_eq!(member_names(&mut w), ["i", "u", "f", "o", "b"]);
            }

            #[test]
            fn roundtrip_strings() {
                let mut doc = fresh();
                let long =
                    String::from("test a very long string that will not fit in any small buffer");
                {
                    let mut w = $writer(&mut doc);
                    put(&mut w, name!("a"), String::from("test this"));
                    let mut b = long.clone();
                    b.persist(&mut w, name!("b"));
                }
                let mut r = $reader(&doc);
                let mut loaded_a = String::new();
                loaded_a.persist(&mut r, name!("a"));
                assert_eq!(loaded_a, "test this");

                let mut slot = None;
                r.string(name!("b"), &mut slot);
                assert_eq!(slot, Some(long.as_str()));
            }

            #[test]
            fn override_last_write_wins() {
                fn write_members(sub: &mut dyn Serializer<'_>) {
                    put(sub, name!("i"), -32i32);
                    put(sub, name!("f"), String::from("waaaaaaa"));
                    serialize_object(sub, name!("nested"), |inner| {
                        put(inner, name!("blah"), String::from("this is a string"));
                    });
                    put(sub, name!("i"), String::from("test"));
                    put(sub, name!("f"), 3.4f32);
                    put(sub, name!("nested"), -34i32);
                }

                let mut doc = fresh();
                {
                    let mut w = $writer(&mut doc);
                    serialize_object(&mut w, name!("a"), write_members);
                    serialize_object(&mut w, name!("b"), write_members);
                    put(&mut w, name!("a"), true);
                }

                let mut r = $reader(&doc);
                let mut a = false;
                r.boolean(name!("a"), &mut a);
                assert!(a);

                let mut called = false;
                serialize_object(&mut r, name!("b"), |sub| {
                    called = true;
                    let mut text = String::new();
                    let mut f = 0f32;
                    let mut nested = 0i32;
                    text.persist(sub, name!("i"));
                    f.persist(sub, name!("f"));
                    nested.persist(sub, name!("nested"));
                    assert_eq!(text, "test");
                    assert_eq!(f, 3.4);
                    assert_eq!(nested, -34);
                    // Survivors appear once each, in surviving-write order.
                    assert_eq!(member_names(sub), ["i", "f", "nested"]);
                });
                assert!(called);
            }

            #[test]
            fn roundtrip_hierarchy() {
                let mut doc = fresh();
                let mut original = build_hierarchy(10);
                {
                    let mut w = $writer(&mut doc);
                    persist_hierarchy(&mut w, &mut original);
                }
                let mut loaded = Hierarchy::default();
                {
                    let mut r = $reader(&doc);
                    persist_hierarchy(&mut r, &mut loaded);
                }
                assert_eq!(*original, loaded);
            }

            #[test]
            fn roundtrip_arrays_and_scalar_coercion() {
                let mut doc = fresh();
                let ints = vec![4i32, -3, 2, -56, 23];
                let uints = vec![4u32, 3, 2, 56, 23];
                let floats = vec![4.25f32, -3.5, 2.75, -56.25, 23.125];
                let bools = vec![true, false, false, true, false, true, false, false];
                let strings = vec![
                    String::from("foo"),
                    String::from("blah"),
                    String::from("very long string so that it does not fit in any small buffer"),
                    String::from("bar"),
                ];
                {
                    let mut w = $writer(&mut doc);
                    put(&mut w, name!("ints"), ints.clone());
                    put(&mut w, name!("uints"), uints.clone());
                    put(&mut w, name!("floats"), floats.clone());
                    put(&mut w, name!("bools"), bools.clone());
                    put(&mut w, name!("strings"), strings.clone());
                    put(&mut w, name!("lone_int"), -3333i32);
                    put(&mut w, name!("lone_string"), String::from("just one string"));
                }
                let mut r = $reader(&doc);

                let mut loaded_ints: Vec<i32> = Vec::new();
                loaded_ints.persist(&mut r, name!("ints"));
                assert_eq!(loaded_ints, ints);

                let mut loaded_uints: Vec<u32> = Vec::new();
                loaded_uints.persist(&mut r, name!("uints"));
                assert_eq!(loaded_uints, uints);

                let mut loaded_floats: Vec<f32> = Vec::new();
                loaded_floats.persist(&mut r, name!("floats"));
                assert_eq!(loaded_floats, floats);

                let mut loaded_bools: Vec<bool> = Vec::new();
                loaded_bools.persist(&mut r, name!("bools"));
                assert_eq!(loaded_bools, bools);

                let mut loaded_strings: Vec<String> = Vec::new();
                loaded_strings.persist(&mut r, name!("strings"));
                assert_eq!(loaded_strings, strings);

                // A scalar read through an array slot becomes one element.
                let mut lone_int: Vec<i32> = Vec::new();
                lone_int.persist(&mut r, name!("lone_int"));
                assert_eq!(lone_int, vec![-3333]);

                let mut lone_string: Vec<String> = Vec::new();
                lone_string.persist(&mut r, name!("lone_string"));
                assert_eq!(lone_string, vec!["just one string"]);
            }

            #[test]
            fn roundtrip_large_array() {
                let mut doc = fresh();
                let ints: Vec<i32> = (0..1453)
                    .map(|i| (i + 1) * if i % 2 == 0 { 1 } else { -1 })
                    .collect();
                {
                    let mut w = $writer(&mut doc);
                    put(&mut w, name!("array"), ints.clone());
                }
                let mut r = $reader(&doc);
                let mut loaded: Vec<i32> = Vec::new();
                loaded.persist(&mut r, name!("array"));
                assert_eq!(loaded, ints);
            }

            #[test]
            fn roundtrip_object_arrays_with_null_slots() {
                let mut doc = fresh();
                let mut original: Vec<Option<Box<Hierarchy>>> = vec![
                    Some(build_hierarchy(4)),
                    Some(build_hierarchy(13)),
                    Some(build_hierarchy(6)),
                    None,
                    Some(build_hierarchy(1)),
                    None,
                ];
                {
                    let mut w = $writer(&mut doc);
                    persist_hierarchies(&mut w, &mut original);
                }
                let mut loaded = Vec::new();
                {
                    let mut r = $reader(&doc);
                    persist_hierarchies(&mut r, &mut loaded);
                }
                assert_eq!(original, loaded);
            }
        }
    };
}

serializer_laws!(
    binary,
    slate::BinaryDocument,
    slate::BinaryWriter::new,
    slate::BinaryReader::new
);

serializer_laws!(
    json,
    serde_json::Value,
    slate::JsonWriter::new,
    slate::JsonReader::new
);

mod files {
    use super::*;
    use slate::{json as json_io, BinaryDocument, BinaryReader, BinaryWriter, JsonReader, JsonWriter};

    #[test]
    fn binary_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hierarchy.bin");

        let mut original = build_hierarchy(10);
        let mut doc = BinaryDocument::new();
        {
            let mut w = BinaryWriter::new(&mut doc);
            persist_hierarchy(&mut w, &mut original);
        }
        doc.save(&path).unwrap();

        let reloaded = BinaryDocument::load(&path).unwrap();
        let mut loaded = Hierarchy::default();
        {
            let mut r = BinaryReader::new(&reloaded);
            persist_hierarchy(&mut r, &mut loaded);
        }
        assert_eq!(*original, loaded);
    }

    #[test]
    fn json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hierarchy.json");

        let mut original = build_hierarchy(10);
        let mut value = serde_json::Value::Null;
        {
            let mut w = JsonWriter::new(&mut value);
            persist_hierarchy(&mut w, &mut original);
        }
        json_io::save(&path, &value).unwrap();

        let reloaded = json_io::load(&path).unwrap();
        let mut loaded = Hierarchy::default();
        {
            let mut r = JsonReader::new(&reloaded);
            persist_hierarchy(&mut r, &mut loaded);
        }
        assert_eq!(*original, loaded);
    }
}
