//! Property-based tests for the protocol and rendering core.
//!
//! Uses proptest to generate byte streams, chunkings and window sizes.

use proptest::prelude::*;

use mudcon::core::telnet::{
    decode_naws, encode_naws, Negotiator, WindowSize, DATA_MARK, DO, IAC, SB, SE, WILL, WONT,
};
use mudcon::core::term::{coalesce, AnsiRenderer, StyleState, StyledRun};
use mudcon::editor::{EchoMode, InputEvent, LineEditor};
use mudcon::history::CommandHistory;

/// Readable traffic: text, line breaks, SGR and other sequences
fn text_piece() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-z <>&]{1,12}".prop_map(|s| s.into_bytes()),
        Just(b"\n".to_vec()),
        Just(b"\r\n".to_vec()),
        (0u8..=49).prop_map(|code| format!("\x1b[{}m", code).into_bytes()),
        Just(b"\x1b[1;31;44m".to_vec()),
        Just(b"\x1b[0m".to_vec()),
        Just(b"\x1b[2J".to_vec()),
        Just(b"\x1b(B".to_vec()),
        Just(b"\x1b]0;title\x07".to_vec()),
    ]
}

/// Protocol traffic and raw bytes: negotiation, Data Mark, lone escapes
fn wire_piece() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        (prop_oneof![Just(DO), Just(WILL), Just(WONT)], any::<u8>())
            .prop_map(|(cmd, opt)| vec![IAC, cmd, opt]),
        Just(vec![IAC, SB, 24, 1, IAC, SE]),
        Just(vec![IAC, SB, 31, IAC, IAC, 7, IAC, SE]),
        Just(vec![IAC, IAC]),
        (any::<u8>(), any::<u8>()).prop_map(|(a, b)| vec![DATA_MARK, a, b]),
        Just(vec![0x1b]),
        prop::collection::vec(any::<u8>(), 1..8),
    ]
}

fn stream_piece() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![text_piece(), wire_piece()]
}

/// Tails that leave something unterminated at the end of the stream
fn open_tail() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(Vec::new()),
        Just(b"\x1b[1;3".to_vec()),
        Just(b"\x1b".to_vec()),
        Just(vec![IAC]),
        Just(vec![IAC, DO]),
        Just(vec![IAC, SB, 24, 1]),
        Just(vec![DATA_MARK, 0]),
    ]
}

fn stream() -> impl Strategy<Value = Vec<u8>> {
    (prop::collection::vec(stream_piece(), 0..40), open_tail()).prop_map(|(pieces, tail)| {
        let mut bytes = pieces.concat();
        bytes.extend(tail);
        bytes
    })
}

/// Split points, as sorted fractions of the stream length
fn cuts() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..1.0, 0..8)
}

fn pipeline() -> (Negotiator, AnsiRenderer) {
    (
        Negotiator::new("ANSI", WindowSize::new(80, 24), true),
        AnsiRenderer::new(20, 2),
    )
}

fn feed(chunks: &[&[u8]]) -> (Vec<StyledRun>, Vec<u8>, StyleState, Vec<u8>) {
    let (mut negotiator, mut renderer) = pipeline();
    let mut runs = Vec::new();
    let mut replies = Vec::new();
    for chunk in chunks {
        let inbound = negotiator.process_inbound(chunk);
        replies.extend(inbound.replies);
        runs.extend(renderer.render(&inbound.data));
    }
    let pending = renderer.pending().to_vec();
    (coalesce(runs), replies, renderer.style(), pending)
}

proptest! {
    /// Splitting the stream anywhere never changes what is rendered or replied.
    #[test]
    fn chunk_boundaries_do_not_matter(bytes in stream(), fractions in cuts()) {
        let mut points: Vec<usize> = fractions
            .iter()
            .map(|f| (f * bytes.len() as f64) as usize)
            .collect();
        points.sort_unstable();

        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut start = 0;
        for point in points {
            chunks.push(&bytes[start..point]);
            start = point;
        }
        chunks.push(&bytes[start..]);

        let whole = feed(&[&bytes]);
        let split = feed(&chunks);
        prop_assert_eq!(split, whole);
    }

    /// NAWS encoding survives byte-stuffing for every size.
    #[test]
    fn naws_round_trip(width in any::<u16>(), height in any::<u16>()) {
        let window = WindowSize::new(width, height);
        let encoded = encode_naws(window);
        let body = &encoded[3..encoded.len() - 2];
        // No lone IAC inside the payload
        prop_assert!(body.iter().filter(|&&b| b == IAC).count() % 2 == 0);
        prop_assert_eq!(decode_naws(&encoded), Some(window));
    }

    /// A run of width + k printable characters breaks right after `width`,
    /// and again only when the second row fills up too.
    #[test]
    fn wrap_is_exact(width in 1usize..120, k in 1usize..120) {
        let k = k.min(width);
        let mut renderer = AnsiRenderer::new(width, 0);
        // Close the session's first line so the margin is out of the picture
        renderer.render(b"\n");

        let text = "x".repeat(width + k);
        let runs = renderer.render(text.as_bytes());
        let out: String = runs.iter().map(|r| r.text.as_str()).collect();

        prop_assert_eq!(out.matches('\n').count(), if k == width { 2 } else { 1 });
        prop_assert_eq!(out.find('\n'), Some(width));
    }

    /// History never holds two equal neighbours and keeps everything else in order.
    #[test]
    fn history_dedup(lines in prop::collection::vec("[ab]{0,2}", 0..30)) {
        let mut editor = LineEditor::new(80, EchoMode::Scrollback, CommandHistory::default());
        for line in &lines {
            for ch in line.chars() {
                editor.apply(InputEvent::Char(ch));
            }
            editor.apply(InputEvent::Enter);
        }

        let mut expected: Vec<String> = Vec::new();
        for line in &lines {
            if expected.last() != Some(line) {
                expected.push(line.clone());
            }
        }
        prop_assert_eq!(editor.history().entries(), expected.as_slice());
    }
}
