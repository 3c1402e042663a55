//! Walkthrough of the intended usage pattern: one persist function per
//! type, reused unchanged for JSON writing, JSON reading, binary writing,
//! and JSON-to-binary conversion.

use slate::{
    name, serialize_object, transcode_json, BinaryDocument, BinaryReader, BinaryWriter,
    JsonReader, JsonWriter, Serializer,
};

#[derive(Default, Debug)]
struct PlayerStats {
    level: i32,
    health: f32,
}

fn persist_player(s: &mut dyn Serializer<'_>, stats: &mut PlayerStats) {
    s.int32(name!("level"), &mut stats.level);
    s.float32(name!("health"), &mut stats.health);
}

#[derive(Default, Debug)]
struct GameWorld {
    collectibles: i32,
    deaths: i32,
    played_time: f32,
    player: PlayerStats,
}

fn persist_world(s: &mut dyn Serializer<'_>, world: &mut GameWorld) {
    s.int32(name!("collectibles"), &mut world.collectibles);
    s.int32(name!("deaths"), &mut world.deaths);
    s.float32(name!("played_time"), &mut world.played_time);
    serialize_object(s, name!("player"), |sub| {
        persist_player(sub, &mut world.player);
    });
}

fn main() {
    let mut world = GameWorld {
        collectibles: 10,
        deaths: 3,
        played_time: 25.5,
        player: PlayerStats {
            level: 12,
            health: 55.5,
        },
    };

    // Save to JSON, the debug-friendly format.
    let mut json_doc = serde_json::Value::Null;
    {
        let mut writer = JsonWriter::new(&mut json_doc);
        persist_world(&mut writer, &mut world);
    }
    println!("saved world:\n{}", serde_json::to_string_pretty(&json_doc).unwrap());

    // Load it back with the same persist function.
    let mut loaded = GameWorld::default();
    {
        let mut reader = JsonReader::new(&json_doc);
        persist_world(&mut reader, &mut loaded);
    }
    println!("loaded world: {loaded:?}");

    // Save to the compact binary format, again with the same function.
    let mut binary_doc = BinaryDocument::new();
    {
        let mut writer = BinaryWriter::new(&mut binary_doc);
        persist_world(&mut writer, &mut world);
    }
    println!(
        "binary document: {} table strings, {} stream bytes",
        binary_doc.strings().len(),
        binary_doc.stream().len()
    );

    // Or convert the JSON document without touching `GameWorld` at all.
    let mut converted = BinaryDocument::new();
    {
        let mut writer = BinaryWriter::new(&mut converted);
        transcode_json(&json_doc, &mut writer);
    }
    assert_eq!(converted.stream(), binary_doc.stream());

    let mut reread = GameWorld::default();
    {
        let mut reader = BinaryReader::new(&converted);
        persist_world(&mut reader, &mut reread);
    }
    println!("converted world: {reread:?}");
}
