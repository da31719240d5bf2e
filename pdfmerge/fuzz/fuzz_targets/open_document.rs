#![no_main]

use libfuzzer_sys::fuzz_target;
use pdfmerge::{Document, MergeInput, MergeOptions, config::EmptyOutputPolicy, merge_documents};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes may fail to parse, but must never panic or hang.
    let Ok(document) = Document::open(data.to_vec()) else {
        return;
    };

    for page in document.pages() {
        let Ok(page) = page else {
            continue;
        };
        let _ = page.content();
        let _ = page.dimensions();
    }

    // Whatever the reader accepts, the writer must be able to copy.
    let options = MergeOptions {
        empty_output: EmptyOutputPolicy::Allow,
        ..MergeOptions::default()
    };
    let inputs = [MergeInput::bytes("fuzz.pdf", data.to_vec())];
    if let Ok(merged) = merge_documents(&inputs, None, &options, None) {
        let reopened = Document::open(merged).expect("merged output must parse");
        assert!(reopened.page_count() <= document.page_count());
    }
});
