//! Decoder fuzz target: untrusted bytes through size, read and view paths.
//! Every path must return a value or a decode error, never panic.
//! Build with: cargo fuzz run codec_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const SCHEMA: &str = r#"
peerUser#59511722 user_id:long = Peer;
peerChat#36c6019a chat_id:long = Peer;
message#1f5c0a21 flags:# out:flags.1?true id:int peer:Peer reply_to:flags.3?int text:string
    entities:flags.7?Vector<long> = Message;
node#2 children:Vector<Node> = Node;
---functions---
invokeWithLayer#da9b0d0d {X:Type} layer:int query:!X = X;
"#;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let codec = match tlschema::Codec::compile(SCHEMA) {
        Ok(c) => c,
        Err(_) => return,
    };
    let _ = codec.size_of_any(data, 0);
    let _ = codec.read_any(data, 0);
    for name in ["message", "Peer", "node"] {
        if let Ok((obj, _)) = codec.read(name, data, 0) {
            let _ = codec.build(name, &obj);
        }
    }
    if let Ok(view) = codec.view("message", data) {
        for i in 0..view.field_count() {
            let _ = view.field(i);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run codec_fuzz");
}
