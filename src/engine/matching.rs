use std::collections::HashMap;

use super::spectrum::HashedPeak;
use super::store::FingerprintStore;
use super::Match;

/// Score each song by its most common offset difference, best first.
pub fn align_matches(
    store: &FingerprintStore,
    query: &[HashedPeak],
    topn: usize,
    seconds_per_frame: f64,
) -> Vec<Match> {
    let mut diff_counts: HashMap<(u64, i64), usize> = HashMap::new();
    for (hash, query_offset) in query {
        for &(song_id, db_offset) in store.lookup(hash) {
            let diff = db_offset as i64 - *query_offset as i64;
            *diff_counts.entry((song_id, diff)).or_default() += 1;
        }
    }

    // Best (count, diff) per song; ties go to the smaller difference
    let mut best: HashMap<u64, (usize, i64)> = HashMap::new();
    for ((song_id, diff), count) in diff_counts {
        best.entry(song_id)
            .and_modify(|current| {
                if count > current.0 || (count == current.0 && diff < current.1) {
                    *current = (count, diff);
                }
            })
            .or_insert((count, diff));
    }

    let mut ranked: Vec<(u64, usize, i64)> = best
        .into_iter()
        .map(|(song_id, (count, diff))| (song_id, count, diff))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .filter_map(|(song_id, count, diff)| {
            let song = store.song(song_id)?;
            Some(Match {
                song_id,
                song_name: song.name.clone(),
                file_hash: song.file_hash.clone(),
                input_total_hashes: query.len(),
                fingerprinted_hashes_in_db: song.hashes.len(),
                hashes_matched_in_input: count,
                input_confidence: ratio(count, query.len()),
                fingerprinted_confidence: ratio(count, song.hashes.len()),
                offset: diff,
                offset_seconds: (diff as f64 * seconds_per_frame * 1e5).round() / 1e5,
            })
        })
        .take(topn)
        .collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 100.0).round() / 100.0
}
