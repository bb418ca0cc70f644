use std::str::FromStr;

use candle_core::Device;
use hkrag_embed::tokenize::tokenize_batch;
use tokenizers::Tokenizer;

fn word_tokenizer() -> Tokenizer {
    Tokenizer::from_str(
        r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {"[UNK]": 0, "hospital": 1, "authority": 2, "clinic": 3},
                "unk_token": "[UNK]"
            }
        }"#,
    )
    .expect("tokenizer json")
}

#[test]
fn batch_is_padded_to_the_longest_row() {
    let texts = vec!["hospital authority clinic".to_string(), "clinic".to_string()];
    let (ids, mask) = tokenize_batch(&word_tokenizer(), &texts, 8, 0, &Device::Cpu).unwrap();
    assert_eq!(ids.dims(), &[2, 3]);
    assert_eq!(ids.to_vec2::<u32>().unwrap(), vec![vec![1, 2, 3], vec![3, 0, 0]]);
    assert_eq!(mask.to_vec2::<u32>().unwrap(), vec![vec![1, 1, 1], vec![1, 0, 0]]);
}

#[test]
fn long_rows_are_truncated_to_max_len() {
    let texts = vec!["hospital authority clinic".to_string()];
    let (ids, mask) = tokenize_batch(&word_tokenizer(), &texts, 2, 0, &Device::Cpu).unwrap();
    assert_eq!(ids.to_vec2::<u32>().unwrap(), vec![vec![1, 2]]);
    assert_eq!(mask.to_vec2::<u32>().unwrap(), vec![vec![1, 1]]);
}
