use std::fmt;

/// Items of one category that could not be transferred, in the order they failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    name: String,
    failures: Vec<String>,
}

impl ReportSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failures: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Record a failed item. Returns `false` if the label was already recorded.
    pub fn record(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.failures.contains(&label) {
            return false;
        }
        self.failures.push(label);
        true
    }
}

/// A category pipeline that stopped early because of a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortedCategory {
    pub name: String,
    pub reason: String,
}

/// Everything that did not make it to the destination during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    sections: Vec<ReportSection>,
    aborted: Vec<AbortedCategory>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The section called `name`, created empty on first use.
    pub fn section(&mut self, name: &str) -> &mut ReportSection {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(ReportSection::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    pub fn get(&self, name: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    pub fn record_aborted(&mut self, name: &str, reason: impl fmt::Display) {
        self.aborted.push(AbortedCategory {
            name: name.to_string(),
            reason: format!("{:#}", reason),
        });
    }

    pub fn aborted(&self) -> &[AbortedCategory] {
        &self.aborted
    }

    pub fn total_failures(&self) -> usize {
        self.sections.iter().map(|s| s.failures.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total_failures() == 0 && self.aborted.is_empty()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Not imported items:")?;
        for section in &self.sections {
            writeln!(f, "{}:", section.name)?;
            for failure in &section.failures {
                writeln!(f, "  {}", failure)?;
            }
        }

        if !self.aborted.is_empty() {
            writeln!(f, "Stopped early:")?;
            for aborted in &self.aborted {
                writeln!(f, "  {}: {}", aborted.name, aborted.reason)?;
            }
        }

        Ok(())
    }
}
