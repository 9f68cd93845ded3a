use pretty_assertions::assert_eq;
use proptest::prelude::*;
use shiko_core::{pack, perceived_len, Packer, MAX_GRAPHEME_BYTES, MAX_STATUS_LENGTH};
use shiko_test_utils::ChunkedReader;

#[tokio::test]
async fn test_long_body_is_cut_at_budget_and_drained() {
    let body = "あ".repeat(2000);
    let reader = ChunkedReader::new(body.as_bytes().chunks(100).map(<[u8]>::to_vec));
    let tracker = reader.tracker();

    let text = pack("@alice ", reader).await.unwrap();

    assert_eq!(perceived_len(&text), MAX_STATUS_LENGTH);
    assert_eq!(text, format!("@alice {}", "あ".repeat(MAX_STATUS_LENGTH - 7)));
    assert!(tracker.fully_consumed());
    assert!(tracker.dropped());
}

#[tokio::test]
async fn test_grapheme_split_across_reads_stays_whole() {
    // "が" written as か + combining voiced mark, split between two reads
    let decomposed = "か\u{3099}";
    let bytes = decomposed.as_bytes();
    let reader = ChunkedReader::new([bytes[..3].to_vec(), bytes[3..].to_vec()]);

    let text = Packer::new(3).pack("@a", reader).await.unwrap();
    assert_eq!(text, format!("@a{decomposed}"));
}

#[tokio::test]
async fn test_cluster_never_cut_at_budget() {
    let text = Packer::new(2)
        .pack("x", "👨‍👩‍👧👨‍👩‍👧".as_bytes())
        .await
        .unwrap();
    assert_eq!(text, "x👨‍👩‍👧");
}

#[tokio::test]
async fn test_remote_mentions_count_as_local() {
    let mention = "@bob@example.social ";
    let body = format!("{mention}{}", "x".repeat(495));
    let text = pack("", body.as_bytes()).await.unwrap();
    // "@bob " is five characters, leaving room for all 495 x's
    assert_eq!(text, body);
    assert!(text.chars().count() > MAX_STATUS_LENGTH);
}

#[tokio::test]
async fn test_mention_straddling_budget_is_kept_whole() {
    // "@bob@e" would push past the budget, "@bob@example.com" counts as "@bob"
    let body = format!("{} @bob@example.com", "x".repeat(494));
    assert_eq!(perceived_len(&body), 499);

    let reader = ChunkedReader::new(body.as_bytes().chunks(7).map(<[u8]>::to_vec));
    let text = pack("", reader).await.unwrap();
    assert_eq!(text, body);
}

#[tokio::test]
async fn test_unfinished_mention_falls_back_to_last_fit() {
    let body = format!("{} @bob@e and more", "x".repeat(494));
    let text = pack("", body.as_bytes()).await.unwrap();
    assert_eq!(text, format!("{} @bob@", "x".repeat(494)));
    assert_eq!(perceived_len(&text), MAX_STATUS_LENGTH);
}

#[tokio::test]
async fn test_oversized_cluster_ends_the_reply() {
    let body = format!("ok e{}tail", "\u{301}".repeat(MAX_GRAPHEME_BYTES));
    let reader = ChunkedReader::new(body.as_bytes().chunks(64).map(<[u8]>::to_vec));
    let tracker = reader.tracker();

    let text = pack("@a ", reader).await.unwrap();

    assert_eq!(text, "@a ok ");
    assert!(tracker.fully_consumed());
}

#[tokio::test]
async fn test_read_failure_returns_partial_and_error() {
    let reader = ChunkedReader::new(["hello ", "wor"]).then_fail();
    let tracker = reader.tracker();

    let err = pack("@alice ", reader).await.unwrap_err();

    assert_eq!(err.source.kind(), std::io::ErrorKind::BrokenPipe);
    assert!(err.partial.starts_with("@alice hello wo"));
    assert!(tracker.dropped());
}

#[tokio::test]
async fn test_empty_body_keeps_prefix() {
    let text = pack("@alice ", tokio::io::empty()).await.unwrap();
    assert_eq!(text, "@alice ");
}

proptest! {
    #[test]
    fn prop_packed_length_within_budget(
        body in "[a-zあ-ん😀@. ]{0,700}",
        chunk in 1usize..64,
        budget in 1usize..600,
    ) {
        let reader = ChunkedReader::new(body.as_bytes().chunks(chunk).map(<[u8]>::to_vec));
        let text = tokio_test::block_on(Packer::new(budget).pack("@u ", reader)).unwrap();
        let full = format!("@u {body}");
        prop_assert!(perceived_len(&text) <= budget);
        prop_assert!(full.starts_with(&text));
    }

    #[test]
    fn prop_result_is_longest_fitting_prefix(
        body in "[ab@. ]{0,40}",
        chunk in 1usize..8,
        budget in 1usize..30,
    ) {
        let full = format!("@u {body}");
        let expected = full
            .char_indices()
            .map(|(idx, c)| idx + c.len_utf8())
            .rfind(|&end| perceived_len(&full[..end]) <= budget)
            .unwrap_or(0);

        let reader = ChunkedReader::new(body.as_bytes().chunks(chunk).map(<[u8]>::to_vec));
        let text = tokio_test::block_on(Packer::new(budget).pack("@u ", reader)).unwrap();
        prop_assert_eq!(text.as_str(), &full[..expected]);
    }

    #[test]
    fn prop_mention_free_text_is_longest_prefix(
        body in "[a-zあ-ん😀 ]{0,700}",
        chunk in 1usize..64,
    ) {
        let reader = ChunkedReader::new(body.as_bytes().chunks(chunk).map(<[u8]>::to_vec));
        let text = tokio_test::block_on(pack("", reader)).unwrap();
        let expected: String = body.chars().take(MAX_STATUS_LENGTH).collect();
        prop_assert_eq!(text, expected);
    }
}
