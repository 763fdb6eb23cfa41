#![no_main]

use arbitrary::Arbitrary;
use formstate::accessor::{get, set};
use formstate::path::Segment;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Step {
    Key(String),
    Index(u8),
    Wide(u64),
}

#[derive(Arbitrary, Debug)]
struct Input {
    container: String,
    steps: Vec<Step>,
    value: String,
}

fuzz_target!(|input: Input| {
    let Ok(container) = serde_json::from_str::<serde_json::Value>(&input.container) else {
        return;
    };
    let path: Vec<Segment> = input
        .steps
        .into_iter()
        .take(8)
        .map(|step| match step {
            Step::Key(k) => Segment::Key(k),
            Step::Index(i) => Segment::Index(i as usize),
            Step::Wide(i) => Segment::Index(usize::try_from(i).unwrap_or(usize::MAX)),
        })
        .collect();
    let value = serde_json::Value::String(input.value);

    let written = set(&container, &path, value.clone());
    assert_eq!(get(&written, &path), Some(&value));
});
