use pige_blob::ByteRange;

/// Parse a `Range` header of the form `bytes=<start>-[<end>]` against an
/// object of `size` bytes.
///
/// Returns `None` whenever the header cannot be served as one partial span:
/// wrong unit, suffix ranges (`bytes=-500`), multiple ranges, garbage, or a
/// span outside `0..size`. Callers then serve the whole object.
pub fn parse_range_header(header: &str, size: u64) -> Option<ByteRange> {
    let ranges = header.trim().strip_prefix("bytes=")?;
    let (start, end) = ranges.split_once('-')?;

    let start: u64 = start.trim().parse().ok()?;
    let end = match end.trim() {
        "" => size.checked_sub(1)?,
        end => end.parse().ok()?,
    };

    let range = ByteRange::new(start, end);
    range.is_satisfiable(size).then_some(range)
}
