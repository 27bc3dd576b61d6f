/// Media ranges of an `Accept` header, most preferred first. Ranges with `q=0` are dropped.
pub fn accepted_media_types(accept: Option<&str>) -> Vec<String> {
    let mut ranges: Vec<(String, f32)> = accept
        .unwrap_or_default()
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';').map(str::trim);
            let range = parts.next().filter(|range| !range.is_empty())?;
            let quality = parts
                .filter_map(|parameter| parameter.strip_prefix("q="))
                .find_map(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            Some((range.to_ascii_lowercase(), quality))
        })
        .filter(|(_, quality)| *quality > 0.0)
        .collect();
    // stable, so equally weighted ranges keep header order
    ranges.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranges.into_iter().map(|(range, _)| range).collect()
}

/// The first candidate whose media type the client accepts, in the client's order of preference.
///
/// None when the header is missing or only wildcards match, so the caller can apply its default.
pub fn select<'a, T>(
    accept: Option<&str>,
    candidates: &'a [T],
    media_type: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    for range in accepted_media_types(accept) {
        if range == "*/*" {
            return None;
        }
        let found = match range.strip_suffix("/*") {
            Some(prefix) => candidates
                .iter()
                .find(|&candidate| media_type(candidate).split('/').next() == Some(prefix)),
            None => candidates.iter().find(|&candidate| media_type(candidate) == range),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}
