use std::collections::{BTreeMap, HashMap};

use crate::types::{Field, FieldSection};

/// Fields in insertion order, unique by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTable {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites an existing field in place, or appends a new one.
    pub fn upsert(&mut self, field: Field) {
        match self.index.get(&field.name) {
            Some(&pos) => self.fields[pos] = field,
            None => {
                self.index.insert(field.name.clone(), self.fields.len());
                self.fields.push(field);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&pos| &self.fields[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Everything gathered for one cluster during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterReport {
    pub cluster: String,
    pub fields: FieldTable,
}

impl ClusterReport {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            fields: FieldTable::new(),
        }
    }

    pub fn upsert(&mut self, field: Field) {
        self.fields.upsert(field);
    }

    pub fn summary_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| matches!(f.section, FieldSection::Summary))
    }

    /// Node group blocks in first-seen order, each holding its fields sorted by sub-metric index.
    pub fn node_groups(&self) -> Vec<(&str, Vec<&Field>)> {
        let mut groups: Vec<(&str, Vec<&Field>)> = Vec::new();
        for field in self.fields.iter() {
            if let FieldSection::NodeGroup(tag) = &field.section {
                match groups.iter_mut().find(|(name, _)| *name == tag.group) {
                    Some((_, members)) => members.push(field),
                    None => groups.push((tag.group.as_str(), vec![field])),
                }
            }
        }
        for (_, members) in groups.iter_mut() {
            members.sort_by_key(|f| match &f.section {
                FieldSection::NodeGroup(tag) => tag.index,
                FieldSection::Summary => 0,
            });
        }
        groups
    }
}

/// All cluster reports of one run, keyed by cluster name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportBook {
    reports: BTreeMap<String, ClusterReport>,
}

impl ReportBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cluster's report, creating it on first sight.
    pub fn entry(&mut self, cluster: &str) -> &mut ClusterReport {
        self.reports
            .entry(cluster.to_string())
            .or_insert_with(|| ClusterReport::new(cluster))
    }

    pub fn get(&self, cluster: &str) -> Option<&ClusterReport> {
        self.reports.get(cluster)
    }

    pub fn get_mut(&mut self, cluster: &str) -> Option<&mut ClusterReport> {
        self.reports.get_mut(cluster)
    }

    pub fn clusters(&self) -> Vec<&str> {
        self.reports.keys().map(String::as_str).collect()
    }

    pub fn reports(&self) -> impl Iterator<Item = &ClusterReport> {
        self.reports.values()
    }

    pub fn into_reports(self) -> Vec<ClusterReport> {
        self.reports.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroupTag;

    fn summary(name: &str, value: &str) -> Field {
        Field {
            name: name.to_string(),
            label: name.to_string(),
            value: value.to_string(),
            section: FieldSection::Summary,
        }
    }

    fn grouped(name: &str, group: &str, index: usize) -> Field {
        Field {
            name: format!("{}_{}", name, group),
            label: name.to_string(),
            value: "1".to_string(),
            section: FieldSection::NodeGroup(GroupTag {
                group: group.to_string(),
                index,
            }),
        }
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let mut table = FieldTable::new();
        table.upsert(summary("cpuRequest", "10.00%"));
        table.upsert(summary("cpuUsage", "20.00%"));
        table.upsert(summary("memoryUsage", "30.00%"));
        table.upsert(summary("cpuRequest", "42.00%"));

        assert_eq!(table.len(), 3);
        assert_eq!(table.names(), vec!["cpuRequest", "cpuUsage", "memoryUsage"]);
        assert_eq!(table.get("cpuRequest").unwrap().value, "42.00%");
    }

    #[test]
    fn test_upsert_sequences_never_duplicate() {
        let writes = [
            ("a", "1"),
            ("b", "1"),
            ("a", "2"),
            ("c", "1"),
            ("b", "2"),
            ("a", "3"),
            ("d", "1"),
            ("c", "2"),
        ];
        let mut table = FieldTable::new();
        for (name, value) in writes {
            table.upsert(summary(name, value));
        }

        assert_eq!(table.names(), vec!["a", "b", "c", "d"]);
        let values: Vec<&str> = table.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, vec!["3", "2", "2", "1"]);
    }

    #[test]
    fn test_node_groups_follow_first_seen_order() {
        let mut report = ClusterReport::new("prod");
        report.upsert(summary("cpuRequest", "1.00%"));
        report.upsert(grouped("cpuUsage", "gpu", 1));
        report.upsert(grouped("nodeCount", "gpu", 0));
        report.upsert(grouped("nodeCount", "8cu", 0));

        let groups = report.node_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "gpu");
        assert_eq!(groups[0].1[0].name, "nodeCount_gpu");
        assert_eq!(groups[0].1[1].name, "cpuUsage_gpu");
        assert_eq!(groups[1].0, "8cu");
        assert_eq!(report.summary_fields().count(), 1);
    }

    #[test]
    fn test_report_book_creates_lazily() {
        let mut book = ReportBook::new();
        assert!(book.is_empty());
        book.entry("uat").upsert(summary("cpuUsage", "1.00%"));
        book.entry("prod").upsert(summary("cpuUsage", "2.00%"));
        book.entry("uat").upsert(summary("cpuUsage", "3.00%"));

        assert_eq!(book.len(), 2);
        assert_eq!(book.clusters(), vec!["prod", "uat"]);
        assert_eq!(book.get("uat").unwrap().fields.len(), 1);
        assert!(book.get("staging").is_none());
    }
}
