use std::collections::{HashMap, HashSet};

use rand::rngs::SmallRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rule_types::{Fact, Rule, RuleId, CENTROID_ID_BASE};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Hierarchical clustering linkage criterion for [`ClusterMethod::Agglomerative`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// Mean pairwise distance between the two clusters' members.
    Average,
    /// Maximum pairwise distance between the two clusters' members.
    Complete,
    /// Minimum pairwise distance between the two clusters' members.
    Single,
}

/// The clustering backend used to partition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterMethod {
    /// Hierarchical clustering over a precomputed Jaccard distance matrix. Deterministic.
    Agglomerative(Linkage),
    /// Lloyd's algorithm over the binary feature vectors, with a handful of
    /// seeded restarts to avoid a poor local optimum.
    KMeans,
}

impl ClusterMethod {
    /// Parses a method tag (`"agglomerative"` or `"kmeans"`), defaulting
    /// agglomerative to average linkage.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownClusterMethod`] for any other tag.
    pub fn parse(tag: &str) -> EngineResult<Self> {
        match tag {
            "agglomerative" => Ok(Self::Agglomerative(Linkage::Average)),
            "kmeans" => Ok(Self::KMeans),
            other => Err(EngineError::unknown_cluster_method(other)),
        }
    }
}

/// The centroid-construction policy applied within each cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CentroidMethod {
    /// Lower approximation: intersection of every member's premises, falling
    /// back to the single most frequent pair if the intersection is empty.
    General,
    /// Upper approximation: union of every member's premises. Never empty.
    Specialized,
    /// Threshold-based: pairs present in at least `centroid_threshold` of
    /// the cluster's rules, falling back to the single most frequent pair if
    /// nothing clears the threshold.
    Weighted,
}

impl CentroidMethod {
    /// Parses a method tag (`"general"`, `"specialized"`, or `"weighted"`).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownCentroidMethod`] for any other tag.
    pub fn parse(tag: &str) -> EngineResult<Self> {
        match tag {
            "general" => Ok(Self::General),
            "specialized" => Ok(Self::Specialized),
            "weighted" => Ok(Self::Weighted),
            other => Err(EngineError::unknown_centroid_method(other)),
        }
    }
}

/// A group of rules sharing a synthetic centroid rule, produced by [`RuleClusterer::fit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCluster {
    pub(crate) cluster_id: usize,
    pub(crate) rules: Vec<Rule>,
    pub(crate) centroid: Rule,
}

impl RuleCluster {
    /// The cluster's stable id (`0..n_clusters`).
    #[must_use]
    pub const fn cluster_id(&self) -> usize {
        self.cluster_id
    }

    /// The rules assigned to this cluster.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The synthetic centroid rule summarizing this cluster.
    #[must_use]
    pub const fn centroid(&self) -> &Rule {
        &self.centroid
    }

    /// The number of rules in this cluster. Equal to `rules().len()`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.rules.len()
    }
}

/// Jaccard-similarity clusterer: partitions a rule list into groups and
/// synthesizes a centroid rule per group.
pub struct RuleClusterer {
    n_clusters: usize,
    cluster_method: ClusterMethod,
    centroid_method: CentroidMethod,
    centroid_threshold: f64,
    seed: u64,
}

impl RuleClusterer {
    /// Builds a clusterer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `n_clusters` is zero or
    /// `centroid_threshold` is outside `[0, 1]`.
    pub fn new(
        n_clusters: usize,
        cluster_method: ClusterMethod,
        centroid_method: CentroidMethod,
        centroid_threshold: f64,
        seed: u64,
    ) -> EngineResult<Self> {
        if n_clusters == 0 {
            return Err(EngineError::invalid_config("n_clusters must be positive"));
        }
        if !(0.0..=1.0).contains(&centroid_threshold) {
            return Err(EngineError::invalid_config("centroid_threshold must be in [0, 1]"));
        }
        Ok(Self {
            n_clusters,
            cluster_method,
            centroid_method,
            centroid_threshold,
            seed,
        })
    }

    /// Clusters `rules`, clamping the requested cluster count to `rules.len()`
    /// if it is larger, and returning an empty list if `rules` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyCluster`] if centroid construction
    /// encounters a cluster with no rules (an internal invariant violation;
    /// should not occur in practice).
    pub fn fit(&self, rules: &[Rule]) -> EngineResult<Vec<RuleCluster>> {
        if rules.is_empty() {
            return Ok(Vec::new());
        }
        let k = self.n_clusters.min(rules.len());

        let (_pair_index, vectors) = vectorize(rules);

        let labels = match self.cluster_method {
            ClusterMethod::Agglomerative(linkage) => agglomerative(&vectors, k, linkage),
            ClusterMethod::KMeans => kmeans(&vectors, k, self.seed),
        };

        let groups = group_by_label(rules, &labels);

        groups
            .into_iter()
            .enumerate()
            .map(|(cluster_id, members)| self.build_cluster(cluster_id, members))
            .collect()
    }

    fn build_cluster(&self, cluster_id: usize, members: Vec<Rule>) -> EngineResult<RuleCluster> {
        if members.is_empty() {
            return Err(EngineError::EmptyCluster { cluster_id });
        }

        let mut premises = match self.centroid_method {
            CentroidMethod::General => intersection_premises(&members),
            CentroidMethod::Specialized => union_premises(&members),
            CentroidMethod::Weighted => weighted_premises(&members, self.centroid_threshold),
        };
        premises.sort_by(|a, b| (a.attribute(), a.value()).cmp(&(b.attribute(), b.value())));

        let conclusion = most_frequent_conclusion(&members);
        let centroid_id: RuleId = CENTROID_ID_BASE + cluster_id as RuleId;
        let centroid = Rule::new(centroid_id, premises, conclusion).map_err(EngineError::Type)?;

        Ok(RuleCluster { cluster_id, rules: members, centroid })
    }
}

/// Enumerates distinct `(attribute, value)` pairs in first-seen order and
/// produces the `n x m` binary feature matrix.
fn vectorize(rules: &[Rule]) -> (HashMap<(String, String), usize>, Vec<Vec<bool>>) {
    let mut index = HashMap::new();
    for rule in rules {
        for premise in rule.premises() {
            let key = (premise.attribute().to_string(), premise.value().to_string());
            let next_id = index.len();
            index.entry(key).or_insert(next_id);
        }
    }

    let m = index.len();
    let vectors = rules
        .iter()
        .map(|rule| {
            let mut row = vec![false; m];
            for premise in rule.premises() {
                let key = (premise.attribute().to_string(), premise.value().to_string());
                if let Some(&col) = index.get(&key) {
                    row[col] = true;
                }
            }
            row
        })
        .collect();

    (index, vectors)
}

/// Jaccard distance between two binary feature vectors.
fn jaccard_distance(a: &[bool], b: &[bool]) -> f64 {
    let mut intersection = 0usize;
    let mut union = 0usize;
    for (&x, &y) in a.iter().zip(b) {
        if x || y {
            union += 1;
            if x && y {
                intersection += 1;
            }
        }
    }
    if union == 0 {
        0.0
    } else {
        1.0 - (intersection as f64 / union as f64)
    }
}

/// Agglomerative clustering with a precomputed distance matrix: repeatedly
/// merges the two closest clusters (by `linkage`) until `k` remain.
fn agglomerative(vectors: &[Vec<bool>], k: usize, linkage: Linkage) -> Vec<usize> {
    let n = vectors.len();
    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = jaccard_distance(&vectors[i], &vectors[j]);
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }

    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    while clusters.len() > k {
        let mut best = (0usize, 1usize, f64::MAX);
        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                let d = linkage_distance(&clusters[i], &clusters[j], &dist, linkage);
                if d < best.2 {
                    best = (i, j, d);
                }
            }
        }
        let (i, j, _) = best;
        let merged = {
            let mut m = clusters[i].clone();
            m.extend(clusters[j].iter().copied());
            m
        };
        // Remove the higher index first so the lower index remains valid.
        clusters.remove(j);
        clusters.remove(i);
        clusters.push(merged);
    }

    labels_from_clusters(n, &clusters)
}

fn linkage_distance(a: &[usize], b: &[usize], dist: &[Vec<f64>], linkage: Linkage) -> f64 {
    let pairwise = a.iter().flat_map(|&i| b.iter().map(move |&j| dist[i][j]));
    match linkage {
        Linkage::Average => {
            let (sum, count) = pairwise.fold((0.0, 0usize), |(s, c), d| (s + d, c + 1));
            if count == 0 {
                0.0
            } else {
                sum / count as f64
            }
        }
        Linkage::Complete => pairwise.fold(f64::MIN, f64::max),
        Linkage::Single => pairwise.fold(f64::MAX, f64::min),
    }
}

/// Lloyd's algorithm over the binary feature vectors (treated as `{0,1}`
/// reals) with a fixed number of seeded restarts, keeping the assignment
/// with the lowest inertia.
fn kmeans(vectors: &[Vec<bool>], k: usize, seed: u64) -> Vec<usize> {
    const RESTARTS: usize = 5;
    const MAX_ITERS: usize = 100;

    let n = vectors.len();
    let m = vectors.first().map_or(0, Vec::len);
    let points: Vec<Vec<f64>> = vectors
        .iter()
        .map(|row| row.iter().map(|&b| f64::from(u8::from(b))).collect())
        .collect();

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut best_labels = vec![0usize; n];
    let mut best_inertia = f64::MAX;

    for _ in 0..RESTARTS {
        let init: Vec<usize> = sample(&mut rng, n, k).into_vec();
        let mut centroids: Vec<Vec<f64>> = init.iter().map(|&i| points[i].clone()).collect();
        let mut labels = vec![0usize; n];

        for _ in 0..MAX_ITERS {
            let mut changed = false;
            for (idx, point) in points.iter().enumerate() {
                let new_label = nearest_centroid(point, &centroids);
                if new_label != labels[idx] {
                    changed = true;
                }
                labels[idx] = new_label;
            }

            let mut sums = vec![vec![0.0; m]; k];
            let mut counts = vec![0usize; k];
            for (point, &label) in points.iter().zip(&labels) {
                counts[label] += 1;
                for (s, p) in sums[label].iter_mut().zip(point) {
                    *s += p;
                }
            }
            for cluster in 0..k {
                if counts[cluster] > 0 {
                    for (c, s) in centroids[cluster].iter_mut().zip(&sums[cluster]) {
                        *c = s / counts[cluster] as f64;
                    }
                }
            }

            if !changed {
                break;
            }
        }

        let inertia: f64 = points
            .iter()
            .zip(&labels)
            .map(|(point, &label)| squared_distance(point, &centroids[label]))
            .sum();
        if inertia < best_inertia {
            best_inertia = inertia;
            best_labels = labels;
        }
    }

    best_labels
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    centroids
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            squared_distance(point, a)
                .partial_cmp(&squared_distance(point, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map_or(0, |(idx, _)| idx)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Re-labels raw cluster assignments so cluster ids are assigned in the
/// order their first member appears in `rules`, for deterministic output
/// independent of clustering-backend internal numbering.
fn labels_from_clusters(n: usize, clusters: &[Vec<usize>]) -> Vec<usize> {
    let mut labels = vec![0usize; n];
    for (cluster_id, members) in clusters.iter().enumerate() {
        for &member in members {
            labels[member] = cluster_id;
        }
    }
    labels
}

fn group_by_label(rules: &[Rule], labels: &[usize]) -> Vec<Vec<Rule>> {
    let mut order = Vec::new();
    let mut groups: HashMap<usize, Vec<Rule>> = HashMap::new();
    for (rule, &label) in rules.iter().zip(labels) {
        if !groups.contains_key(&label) {
            order.push(label);
        }
        groups.entry(label).or_default().push(rule.clone());
    }
    order.into_iter().map(|label| groups.remove(&label).unwrap_or_default()).collect()
}

fn intersection_premises(members: &[Rule]) -> Vec<Fact> {
    let mut sets = members.iter().map(|r| r.premises().iter().cloned().collect::<HashSet<_>>());
    let Some(first) = sets.next() else {
        return Vec::new();
    };
    let intersection = sets.fold(first, |acc, set| acc.intersection(&set).cloned().collect());
    if intersection.is_empty() {
        vec![most_frequent_pair(members)]
    } else {
        intersection.into_iter().collect()
    }
}

fn union_premises(members: &[Rule]) -> Vec<Fact> {
    let mut union: HashSet<Fact> = HashSet::new();
    for rule in members {
        union.extend(rule.premises().iter().cloned());
    }
    union.into_iter().collect()
}

fn weighted_premises(members: &[Rule], threshold: f64) -> Vec<Fact> {
    let mut counts: Vec<(Fact, usize)> = Vec::new();
    let mut index: HashMap<Fact, usize> = HashMap::new();
    for rule in members {
        for premise in rule.premises() {
            match index.get(premise) {
                Some(&pos) => counts[pos].1 += 1,
                None => {
                    index.insert(premise.clone(), counts.len());
                    counts.push((premise.clone(), 1));
                }
            }
        }
    }

    let total = members.len() as f64;
    let selected: Vec<Fact> = counts
        .iter()
        .filter(|(_, count)| (*count as f64 / total) >= threshold)
        .map(|(fact, _)| fact.clone())
        .collect();

    if selected.is_empty() {
        vec![most_frequent_pair(members)]
    } else {
        selected
    }
}

/// The single most frequent `(attribute, value)` pair across `members`,
/// ties broken by first-encountered order.
fn most_frequent_pair(members: &[Rule]) -> Fact {
    let mut counts: Vec<(Fact, usize)> = Vec::new();
    let mut index: HashMap<Fact, usize> = HashMap::new();
    for rule in members {
        for premise in rule.premises() {
            match index.get(premise) {
                Some(&pos) => counts[pos].1 += 1,
                None => {
                    index.insert(premise.clone(), counts.len());
                    counts.push((premise.clone(), 1));
                }
            }
        }
    }
    pick_max_first_encountered(counts)
}

/// The cluster's most frequent conclusion fact, ties broken by
/// first-encountered order.
fn most_frequent_conclusion(members: &[Rule]) -> Fact {
    let mut counts: Vec<(Fact, usize)> = Vec::new();
    let mut index: HashMap<Fact, usize> = HashMap::new();
    for rule in members {
        let conclusion = rule.conclusion();
        match index.get(conclusion) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                index.insert(conclusion.clone(), counts.len());
                counts.push((conclusion.clone(), 1));
            }
        }
    }
    pick_max_first_encountered(counts)
}

fn pick_max_first_encountered(counts: Vec<(Fact, usize)>) -> Fact {
    let mut best: Option<(Fact, usize)> = None;
    for (fact, count) in counts {
        match &best {
            Some((_, best_count)) if count <= *best_count => {}
            _ => best = Some((fact, count)),
        }
    }
    best.map_or_else(|| unreachable!("cluster member list is non-empty"), |(fact, _)| fact)
}
