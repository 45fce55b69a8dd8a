//! JUnit XML reporter
//!
//! ```xml
//! <testsuite>
//!   <testcase name="test(a, 10)" classname="params" time="0.000"/>
//!   <testcase name="broken()" time="0.001">
//!     <failure type="exception">boom</failure>
//!   </testcase>
//! </testsuite>
//! ```

use std::io::{self, Write};

use rigor_core::{Outcome, TestResult};

use super::Reporter;
use super::xml::XmlWriter;

#[derive(Debug, Default)]
pub struct JunitReporter {
    results: Vec<TestResult>,
}

impl JunitReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for JunitReporter {
    fn after_test(&mut self, result: &TestResult) {
        self.results.push(result.clone());
    }

    fn finalize(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let mut xml = XmlWriter::new(out);
        xml.declaration()?;
        xml.start("testsuite", &[])?;
        for result in self.results.drain(..) {
            write_case(&mut xml, &result)?;
        }
        xml.end("testsuite")?;
        xml.finish()?.flush()
    }
}

fn write_case<W: Write>(xml: &mut XmlWriter<W>, result: &TestResult) -> io::Result<()> {
    let mut attrs = vec![("name", result.name.clone())];
    let qualified = result.test.qualified_name();
    if qualified.len() > 1 {
        attrs.push(("classname", qualified[..qualified.len() - 1].join("::")));
    }
    attrs.push(("time", format!("{:.3}", result.duration_secs())));

    let message = match result.outcome {
        Outcome::Fail => result.message(),
        Outcome::Pass | Outcome::Skip => None,
    };
    let has_body = message.is_some()
        || result.is_skipped()
        || !result.stdout.is_empty()
        || !result.stderr.is_empty();
    if !has_body {
        return xml.empty("testcase", &attrs);
    }

    xml.start("testcase", &attrs)?;
    if let Some(message) = message {
        let kind = result.failure.as_ref().map_or("unexpected-pass", |failure| failure.kind());
        xml.text_element("failure", &[("type", kind.to_string())], message)?;
    }
    if result.is_skipped() {
        xml.empty("skipped", &[])?;
    }
    if !result.stdout.is_empty() {
        xml.text_element("system-out", &[], &result.stdout)?;
    }
    if !result.stderr.is_empty() {
        xml.text_element("system-err", &[], &result.stderr)?;
    }
    xml.end("testcase")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rigor_core::{Failure, TestDefinition, expand};

    use super::*;

    fn result(name: &str, outcome: Outcome) -> TestResult {
        let test = Arc::new(TestDefinition::builder(name).run(|| {}));
        let invocation = expand(&test, &Default::default()).unwrap().remove(0);
        TestResult::new(&invocation, outcome)
    }

    fn render(results: &[TestResult]) -> String {
        let mut reporter = JunitReporter::new();
        for result in results {
            reporter.after_test(result);
        }
        let mut out = Vec::new();
        reporter.finalize(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_document_shape() {
        let pass = result("suite::ok", Outcome::Pass);
        let mut fail = result("broken", Outcome::Fail);
        fail.failure = Some(Failure::Exception("a < b".into()));
        let skip = result("later", Outcome::Skip);

        let out = render(&[pass, fail, skip]);
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("<testsuite>"));
        assert!(out.contains("<testcase name=\"ok()\" classname=\"suite\" time=\"0.000\"/>"));
        assert!(out.contains("<failure type=\"exception\">a &lt; b</failure>"));
        assert!(out.contains("<skipped/>"));
        assert!(out.trim_end().ends_with("</testsuite>"));
    }

    #[test]
    fn test_unexpected_pass_is_failure() {
        let test = Arc::new(TestDefinition::builder("xpass").expect_failure().run(|| {}));
        let invocation = expand(&test, &Default::default()).unwrap().remove(0);
        let out = render(&[TestResult::new(&invocation, Outcome::Fail)]);
        assert!(out.contains("<failure type=\"unexpected-pass\">passed but was expected to fail</failure>"));
    }

    #[test]
    fn test_empty_run() {
        let out = render(&[]);
        assert!(out.contains("<testsuite>"));
        assert!(out.contains("</testsuite>"));
    }
}
