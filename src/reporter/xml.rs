//! Small event-writer layer over `quick_xml` shared by the XML reporters.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

pub(crate) type Attrs<'a> = &'a [(&'a str, String)];

pub(crate) struct XmlWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> io::Result<()> {
        self.writer.write_event(event).map_err(io::Error::other)
    }

    pub fn declaration(&mut self) -> io::Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    pub fn start(&mut self, name: &str, attrs: Attrs<'_>) -> io::Result<()> {
        self.event(Event::Start(element(name, attrs)))
    }

    pub fn end(&mut self, name: &str) -> io::Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    pub fn empty(&mut self, name: &str, attrs: Attrs<'_>) -> io::Result<()> {
        self.event(Event::Empty(element(name, attrs)))
    }

    /// `<name attrs>text</name>`, text escaped.
    pub fn text_element(&mut self, name: &str, attrs: Attrs<'_>, text: &str) -> io::Result<()> {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    /// Terminate the document with a newline.
    pub fn finish(self) -> io::Result<W> {
        let mut inner = self.writer.into_inner();
        inner.write_all(b"\n")?;
        Ok(inner)
    }
}

fn element<'a>(name: &'a str, attrs: Attrs<'a>) -> BytesStart<'a> {
    BytesStart::new(name).with_attributes(attrs.iter().map(|(key, value)| (*key, value.as_str())))
}
