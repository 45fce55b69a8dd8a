//! Catch2 XML reporter (format version 3)
//!
//! The first qualified-name segment of a test becomes a `<TestCase>`; the
//! remaining segments nest as `<Section>`s, and every invocation is a leaf
//! section carrying its source location. Sections with the same name under
//! the same parent are merged.
//!
//! Tallies follow Catch2's rules: a section fails when it has more failures
//! than expected failures, and an expected failure counts as both.

use std::io::{self, Write};

use rigor_core::{AssertionInfo, Failure, Outcome, SourceLocation, TestPlan, TestResult};

use super::Reporter;
use super::xml::XmlWriter;

const XML_FORMAT_VERSION: &str = "3";
const CATCH2_VERSION: &str = "3.8.1";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    successes: u32,
    failures: u32,
    expected_failures: u32,
    skips: u32,
    duration: f64,
}

impl Tally {
    fn add(&mut self, other: &Tally) {
        self.successes += other.successes;
        self.failures += other.failures;
        self.expected_failures += other.expected_failures;
        self.skips += other.skips;
        self.duration += other.duration;
    }

    fn failed(&self) -> bool {
        self.failures > self.expected_failures
    }
}

#[derive(Debug, Default)]
struct Section {
    name: String,
    location: Option<SourceLocation>,
    sections: Vec<Section>,
    expressions: Vec<AssertionInfo>,
    exception: Option<String>,
    failure: Option<String>,
    tally: Tally,
}

impl Section {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Totals of this section including every nested section.
    fn totals(&self) -> Tally {
        let mut total = self.tally;
        for section in &self.sections {
            total.add(&section.totals());
        }
        total
    }

    fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> io::Result<()> {
        let mut attrs = vec![("name", self.name.clone())];
        push_location(&mut attrs, self.location);
        xml.start("Section", &attrs)?;

        for expression in &self.expressions {
            write_expression(xml, expression)?;
        }
        if let Some(exception) = &self.exception {
            let mut attrs = Vec::new();
            push_location(&mut attrs, self.location);
            xml.text_element("Exception", &attrs, exception)?;
        }
        if let Some(failure) = &self.failure {
            let mut attrs = Vec::new();
            push_location(&mut attrs, self.location);
            xml.text_element("Failure", &attrs, failure)?;
        }
        for section in &self.sections {
            section.write(xml)?;
        }

        let totals = self.totals();
        xml.empty(
            "OverallResults",
            &[
                ("successes", totals.successes.to_string()),
                ("failures", totals.failures.to_string()),
                ("expectedFailures", totals.expected_failures.to_string()),
                ("skipped", (totals.skips > 0).to_string()),
                ("durationInSeconds", seconds(totals.duration)),
            ],
        )?;
        xml.end("Section")
    }
}

#[derive(Debug, Default)]
struct TestCase {
    name: String,
    location: Option<SourceLocation>,
    sections: Vec<Section>,
    stdout: String,
    stderr: String,
}

impl TestCase {
    fn totals(&self) -> Tally {
        let mut total = Tally::default();
        for section in &self.sections {
            total.add(&section.totals());
        }
        total
    }

    fn success(&self) -> bool {
        self.sections.iter().all(|section| !section.totals().failed())
    }

    fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> io::Result<()> {
        let mut attrs = vec![("name", self.name.clone())];
        push_location(&mut attrs, self.location);
        xml.start("TestCase", &attrs)?;
        for section in &self.sections {
            section.write(xml)?;
        }

        let totals = self.totals();
        let attrs = [
            ("success", self.success().to_string()),
            ("skips", totals.skips.to_string()),
            ("durationInSeconds", seconds(totals.duration)),
        ];
        if self.stdout.is_empty() && self.stderr.is_empty() {
            xml.empty("OverallResult", &attrs)?;
        } else {
            xml.start("OverallResult", &attrs)?;
            if !self.stdout.is_empty() {
                xml.text_element("StdOut", &[], &self.stdout)?;
            }
            if !self.stderr.is_empty() {
                xml.text_element("StdErr", &[], &self.stderr)?;
            }
            xml.end("OverallResult")?;
        }
        xml.end("TestCase")
    }
}

fn child_entry<'a>(sections: &'a mut Vec<Section>, name: &str) -> &'a mut Section {
    let index = match sections.iter().position(|section| section.name == name) {
        Some(index) => index,
        None => {
            sections.push(Section::named(name));
            sections.len() - 1
        }
    };
    &mut sections[index]
}

fn push_location(attrs: &mut Vec<(&str, String)>, location: Option<SourceLocation>) {
    if let Some(location) = location {
        attrs.push(("filename", location.file.to_string()));
        attrs.push(("line", location.line.to_string()));
    }
}

fn write_expression<W: Write>(xml: &mut XmlWriter<W>, expression: &AssertionInfo) -> io::Result<()> {
    xml.start(
        "Expression",
        &[
            ("success", expression.success.to_string()),
            ("type", "CHECK".to_string()),
            ("filename", expression.location.file.to_string()),
            ("line", expression.location.line.to_string()),
        ],
    )?;
    xml.text_element("Original", &[], &expression.expression)?;
    let expanded = if expression.expanded.is_empty() {
        &expression.expression
    } else {
        &expression.expanded
    };
    xml.text_element("Expanded", &[], expanded)?;
    xml.end("Expression")
}

fn seconds(duration: f64) -> String {
    format!("{duration:.6}")
}

/// Accumulates a Catch2 report and writes it on `finalize`.
#[derive(Debug, Default)]
pub struct Catch2Reporter {
    name: Option<String>,
    rng_seed: u64,
    cases: Vec<TestCase>,
}

impl Catch2Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name recorded on the `<Catch2TestRun>` element.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    fn case(&mut self, name: &str) -> &mut TestCase {
        let index = match self.cases.iter().position(|case| case.name == name) {
            Some(index) => index,
            None => {
                self.cases.push(TestCase {
                    name: name.to_string(),
                    ..TestCase::default()
                });
                self.cases.len() - 1
            }
        };
        &mut self.cases[index]
    }
}

impl Reporter for Catch2Reporter {
    fn after_test(&mut self, result: &TestResult) {
        let qualified = result.test.qualified_name();
        let location = result.test.location();
        let case = self.case(qualified.first().map_or("", String::as_str));
        if qualified.len() == 1 {
            case.location = Some(location);
        }
        case.stdout.push_str(&result.stdout);
        case.stderr.push_str(&result.stderr);

        let mut sections = &mut case.sections;
        for segment in qualified.iter().skip(1) {
            sections = &mut child_entry(sections, segment).sections;
        }
        let leaf = child_entry(sections, &result.name);
        leaf.location = Some(location);
        leaf.tally.duration += result.duration_secs();

        match result.outcome {
            Outcome::Skip => leaf.tally.skips += 1,
            Outcome::Pass if result.is_expected_failure() => {
                leaf.tally.failures += 1;
                leaf.tally.expected_failures += 1;
            }
            Outcome::Pass => leaf.tally.successes += 1,
            Outcome::Fail => {
                leaf.tally.failures += 1;
                let failed_checks: Vec<AssertionInfo> = result
                    .assertions
                    .iter()
                    .filter(|assertion| !assertion.success)
                    .cloned()
                    .collect();
                match &result.failure {
                    Some(Failure::Assertion(failure)) if failed_checks.is_empty() => {
                        leaf.failure = Some(failure.message.clone());
                    }
                    Some(Failure::Assertion(_)) => leaf.expressions.extend(failed_checks),
                    Some(failure @ (Failure::Exception(_) | Failure::Unknown)) => {
                        leaf.exception = Some(failure.message().to_string());
                    }
                    None => leaf.failure = result.message().map(str::to_string),
                }
            }
        }
    }

    fn list_tests(&mut self, plan: &TestPlan, out: &mut dyn Write) -> io::Result<()> {
        let root = plan.root();
        let mut xml = XmlWriter::new(out);
        xml.declaration()?;
        xml.start("MatchingTests", &[])?;
        for child in root.children() {
            xml.start("TestCase", &[])?;
            xml.text_element("Name", &[], child.name())?;
            xml.end("TestCase")?;
        }
        for planned in root.tests() {
            let test = planned.test();
            xml.start("TestCase", &[])?;
            xml.text_element("Name", &[], test.base_name())?;
            xml.start("SourceInfo", &[])?;
            xml.text_element("File", &[], test.location().file)?;
            xml.text_element("Line", &[], &test.location().line.to_string())?;
            xml.end("SourceInfo")?;
            xml.end("TestCase")?;
        }
        xml.end("MatchingTests")?;
        xml.finish()?.flush()
    }

    fn finalize(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let mut xml = XmlWriter::new(out);
        xml.declaration()?;

        let mut attrs = Vec::new();
        if let Some(name) = &self.name {
            attrs.push(("name", name.clone()));
        }
        attrs.push(("rng-seed", self.rng_seed.to_string()));
        attrs.push(("xml-format-version", XML_FORMAT_VERSION.to_string()));
        attrs.push(("catch2-version", CATCH2_VERSION.to_string()));
        xml.start("Catch2TestRun", &attrs)?;

        let mut run = Tally::default();
        let mut cases = Tally::default();
        for case in &self.cases {
            case.write(&mut xml)?;
            let totals = case.totals();
            if case.success() {
                run.successes += 1;
            } else {
                run.failures += 1;
            }
            run.skips += totals.skips;
            cases.add(&totals);
        }

        xml.empty(
            "OverallResults",
            &[
                ("successes", run.successes.to_string()),
                ("failures", run.failures.to_string()),
                ("expectedFailures", run.expected_failures.to_string()),
                ("skips", run.skips.to_string()),
            ],
        )?;
        xml.empty(
            "OverallResultsCases",
            &[
                ("successes", cases.successes.to_string()),
                ("failures", cases.failures.to_string()),
                ("expectedFailures", cases.expected_failures.to_string()),
                ("skips", cases.skips.to_string()),
            ],
        )?;
        xml.end("Catch2TestRun")?;
        self.cases.clear();
        xml.finish()?.flush()
    }
}
