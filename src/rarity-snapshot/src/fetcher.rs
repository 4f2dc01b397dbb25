use std::time::Duration;

use futures::future::join_all;
use itertools::Itertools;
use tokio::time::timeout;

use crate::contract::RarityReader;

/// Reserved rarity code meaning "no assignment".
pub const UNASSIGNED: u8 = 0;

/// Rarity code read for a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RarityEntry {
    pub token_id: u64,
    pub rarity: u8,
}

/// Inclusive token id interval and the number of reads to keep in flight at once.
#[derive(Debug, Clone)]
pub struct QueryRange {
    start: u64,
    end: u64,
    batch_size: usize,
}

impl QueryRange {
    pub fn new(start: u64, end: u64, batch_size: usize) -> anyhow::Result<Self> {
        if batch_size == 0 {
            anyhow::bail!("batch size must be at least 1");
        }
        if start > end {
            anyhow::bail!("invalid token range: {start} > {end}");
        }

        Ok(Self {
            start,
            end,
            batch_size,
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Total number of token ids in the range.
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Queries per-token rarities batch by batch through a [`RarityReader`].
pub struct RarityFetcher<R> {
    reader: R,
    read_timeout: Duration,
}

impl<R: RarityReader> RarityFetcher<R> {
    pub fn new(reader: R, read_timeout: Duration) -> Self {
        Self {
            reader,
            read_timeout,
        }
    }

    /// Reads the rarity of every token in the range, one batch at a time.
    ///
    /// Reads within a batch run concurrently; the next batch starts only once
    /// every read of the current one has settled. A failed or timed out read
    /// is recorded as [`UNASSIGNED`] and never aborts the run.
    pub async fn collect(&self, range: &QueryRange) -> Vec<RarityEntry> {
        let mut results = Vec::with_capacity(range.size() as usize);

        // Collect batches before iteration, otherwise the future won't be `Send`
        let batches: Vec<Vec<u64>> = (range.start()..=range.end())
            .chunks(range.batch_size())
            .into_iter()
            .map(Iterator::collect)
            .collect();

        for token_ids in batches {
            log::info!(
                "querying rarities for tokens {} to {}",
                token_ids.first().unwrap(),
                token_ids.last().unwrap()
            );

            let reads = token_ids.iter().map(|&token_id| self.read_one(token_id));
            results.extend(join_all(reads).await);

            log::info!("progress: {}/{} tokens", results.len(), range.size());
        }

        results
    }

    async fn read_one(&self, token_id: u64) -> RarityEntry {
        match timeout(self.read_timeout, self.reader.read_rarity(token_id)).await {
            Ok(Ok(rarity)) => RarityEntry { token_id, rarity },
            Ok(Err(err)) => {
                log::warn!("rarity read failed for token {token_id}: {err:#}");
                RarityEntry {
                    token_id,
                    rarity: UNASSIGNED,
                }
            }
            Err(_) => {
                log::warn!(
                    "rarity read for token {token_id} timed out after {:?}",
                    self.read_timeout
                );
                RarityEntry {
                    token_id,
                    rarity: UNASSIGNED,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    const READ_TIMEOUT: Duration = Duration::from_secs(1);

    struct ScriptedReader {
        values: HashMap<u64, u8>,
        failing: HashSet<u64>,
        delay: Option<Duration>,
    }

    impl ScriptedReader {
        fn new(values: &[(u64, u8)]) -> Self {
            Self {
                values: values.iter().copied().collect(),
                failing: HashSet::new(),
                delay: None,
            }
        }

        fn failing_on(mut self, token_id: u64) -> Self {
            self.failing.insert(token_id);
            self
        }
    }

    #[async_trait]
    impl RarityReader for ScriptedReader {
        async fn read_rarity(&self, token_id: u64) -> anyhow::Result<u8> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&token_id) {
                anyhow::bail!("node rejected the call");
            }
            Ok(self.values.get(&token_id).copied().unwrap_or(UNASSIGNED))
        }
    }

    /// Tracks how many reads are in flight at once.
    struct CountingReader {
        current: Arc<AtomicUsize>,
        max: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RarityReader for CountingReader {
        async fn read_rarity(&self, _token_id: u64) -> anyhow::Result<u8> {
            let in_flight = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(in_flight, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_should_cover_the_whole_range_in_order() {
        let reader = ScriptedReader::new(&[(1, 2), (2, 1), (3, 3)]);
        let fetcher = RarityFetcher::new(reader, READ_TIMEOUT);
        let range = QueryRange::new(1, 3, 2).unwrap();

        let results = fetcher.collect(&range).await;

        assert_eq!(
            results,
            vec![
                RarityEntry {
                    token_id: 1,
                    rarity: 2
                },
                RarityEntry {
                    token_id: 2,
                    rarity: 1
                },
                RarityEntry {
                    token_id: 3,
                    rarity: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_should_collect_identical_results_twice() {
        let reader = ScriptedReader::new(&[(1, 1), (2, 3), (3, 2), (4, 1), (5, 2)]);
        let fetcher = RarityFetcher::new(reader, READ_TIMEOUT);
        let range = QueryRange::new(1, 5, 3).unwrap();

        let first = fetcher.collect(&range).await;
        let second = fetcher.collect(&range).await;

        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_should_record_failed_read_as_unassigned() {
        let reader = ScriptedReader::new(&[(1, 2), (3, 3), (5, 1)]).failing_on(4);
        let fetcher = RarityFetcher::new(reader, READ_TIMEOUT);
        let range = QueryRange::new(1, 5, 2).unwrap();

        let results = fetcher.collect(&range).await;

        assert_eq!(
            results,
            vec![
                RarityEntry {
                    token_id: 1,
                    rarity: 2
                },
                RarityEntry {
                    token_id: 2,
                    rarity: UNASSIGNED
                },
                RarityEntry {
                    token_id: 3,
                    rarity: 3
                },
                RarityEntry {
                    token_id: 4,
                    rarity: UNASSIGNED
                },
                RarityEntry {
                    token_id: 5,
                    rarity: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_should_settle_hung_read_as_unassigned() {
        let mut reader = ScriptedReader::new(&[(1, 3)]);
        reader.delay = Some(Duration::from_millis(200));
        let fetcher = RarityFetcher::new(reader, Duration::from_millis(10));
        let range = QueryRange::new(1, 1, 1).unwrap();

        let results = fetcher.collect(&range).await;

        assert_eq!(
            results,
            vec![RarityEntry {
                token_id: 1,
                rarity: UNASSIGNED
            }]
        );
    }

    #[tokio::test]
    async fn test_should_cap_in_flight_reads_at_batch_size() {
        let current = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let reader = CountingReader {
            current: current.clone(),
            max: max.clone(),
        };
        let fetcher = RarityFetcher::new(reader, READ_TIMEOUT);
        let range = QueryRange::new(1, 10, 3).unwrap();

        let results = fetcher.collect(&range).await;

        assert_eq!(results.len(), 10);
        assert_eq!(max.load(Ordering::SeqCst), 3);
        assert_eq!(current.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_should_reject_zero_batch_size() {
        assert!(QueryRange::new(1, 5, 0).is_err());
    }

    #[test]
    fn test_should_reject_inverted_range() {
        assert!(QueryRange::new(5, 1, 2).is_err());
    }

    #[test]
    fn test_range_size_is_inclusive() {
        assert_eq!(QueryRange::new(1, 500, 50).unwrap().size(), 500);
        assert_eq!(QueryRange::new(7, 7, 1).unwrap().size(), 1);
    }
}
