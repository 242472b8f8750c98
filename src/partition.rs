//! Rows split across a fixed number of partitions, processed in parallel on a [`Session`].

use rayon::prelude::*;

use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct Partitioned<T> {
    partitions: Vec<Vec<T>>,
}
impl<T> Partitioned<T> {
    /// Deals rows into `num_partitions` partitions in round-robin order: row `i` lands in
    /// partition `i mod num_partitions`.
    pub fn round_robin(rows: Vec<T>, num_partitions: usize) -> Self {
        let num_partitions = num_partitions.max(1);
        let mut partitions: Vec<Vec<T>> = (0..num_partitions)
            .map(|_| Vec::with_capacity(rows.len() / num_partitions + 1))
            .collect();
        for (index, row) in rows.into_iter().enumerate() {
            partitions[index % num_partitions].push(row);
        }
        Self { partitions }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn partition_sizes(&self) -> Vec<usize> {
        self.partitions.iter().map(Vec::len).collect()
    }

    /// Concatenates the partitions in partition order.
    pub fn collect(self) -> Vec<T> {
        self.partitions.into_iter().flatten().collect()
    }
}

impl<T: Send> Partitioned<T> {
    /// Applies `f` to every row, one task per partition, on the session's workers. Fails with
    /// the first error encountered in partition order.
    pub fn try_map<U, E, F>(self, session: &Session, f: F) -> Result<Partitioned<U>, E>
    where
        U: Send,
        E: Send,
        F: Fn(T) -> Result<U, E> + Sync + Send,
    {
        let partitions = session.install(|| {
            self.partitions
                .into_par_iter()
                .map(|partition| partition.into_iter().map(&f).collect::<Result<Vec<_>, _>>())
                .collect::<Vec<_>>()
        });
        let partitions = partitions.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Partitioned { partitions })
    }
}

#[cfg(test)]
mod tests {
    use crate::session::SessionConfig;

    use super::*;

    fn session(partitions: usize) -> Session {
        Session::open(&SessionConfig {
            partitions,
            scratch_dir: None,
        })
        .unwrap()
    }

    #[test]
    fn round_robin_distribution() {
        let partitioned = Partitioned::round_robin((0..8).collect(), 3);
        assert_eq!(3, partitioned.num_partitions());
        assert_eq!(8, partitioned.len());
        assert_eq!(vec![3, 3, 2], partitioned.partition_sizes());
        assert_eq!(vec![0, 3, 6, 1, 4, 7, 2, 5], partitioned.collect());
    }

    #[test]
    fn fewer_rows_than_partitions() {
        let partitioned = Partitioned::round_robin(vec!['a', 'b'], 6);
        assert_eq!(vec![1, 1, 0, 0, 0, 0], partitioned.partition_sizes());

        let empty = Partitioned::<u8>::round_robin(vec![], 6);
        assert!(empty.is_empty());
        assert_eq!(6, empty.num_partitions());
    }

    #[test]
    fn try_map_preserves_layout() {
        let session = session(4);
        let partitioned = Partitioned::round_robin((1..=10).collect::<Vec<u32>>(), 4);
        let squared = partitioned
            .clone()
            .try_map(&session, |value| Ok::<_, ()>(value * value))
            .unwrap();
        assert_eq!(partitioned.partition_sizes(), squared.partition_sizes());
        let expected: Vec<_> = partitioned.collect().into_iter().map(|value| value * value).collect();
        assert_eq!(expected, squared.collect());
    }

    #[test]
    fn try_map_reports_first_error() {
        let session = session(3);
        let partitioned = Partitioned::round_robin((0..9).collect::<Vec<u32>>(), 3);
        let err = partitioned
            .try_map(&session, |value| if value % 4 == 1 { Err(value) } else { Ok(value) })
            .unwrap_err();
        // partition 0 holds [0, 3, 6], partition 1 holds [1, 4, 7]
        assert_eq!(1, err);
    }
}
