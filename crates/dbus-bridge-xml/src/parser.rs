use xmlparser::{ElementEnd, Token};

use crate::error::ErrorKind;
use crate::signature;
use crate::{
    Access, Annotation, Argument, Description, Direction, Doc, Error, Interface, Method, Node,
    Property, Result, Signal,
};

/// Parse the contents of an introspection descriptor.
///
/// The document must consist of a single root `<node>` element. Interfaces
/// are returned in declaration order; only the names of child nodes are
/// retained. Unknown elements below the root are skipped together with their
/// contents, and unknown attributes are ignored.
pub fn parse_node(descriptor: &str) -> Result<Node<'_>> {
    let tokenizer = xmlparser::Tokenizer::from(descriptor);

    let mut stack = vec![];
    let mut root = None;

    let mut path = String::new();

    macro_rules! expect_end {
        ($end:expr, $expected:literal) => {
            if let Some(end) = $end {
                if end != $expected {
                    return Err(Error::new(
                        path,
                        ErrorKind::MismatchingEnd {
                            expected: $expected.into(),
                            actual: end.into(),
                        },
                    ));
                }
            }
        };
    }

    macro_rules! build {
        ($builder:expr) => {
            $builder
                .build()
                .map_err(|kind| Error::new(path.as_str(), kind))?
        };
    }

    for token in tokenizer {
        let token = match token {
            Ok(token) => token,
            Err(error) => return Err(Error::new(path, error)),
        };

        match token {
            Token::ElementStart { local, .. } => {
                match (stack.last(), local.as_str()) {
                    (None, "node") if root.is_none() => {
                        stack.push(State::Node(NodeBuilder::default()));
                    }
                    (Some(State::Node(..)), "node") => {
                        stack.push(State::Node(NodeBuilder::default()));
                    }
                    (Some(State::Node(..)), "interface") => {
                        stack.push(State::Interface(InterfaceBuilder::default()));
                    }
                    (Some(State::Interface(..)), "method") => {
                        stack.push(State::Method(MethodBuilder::default()));
                    }
                    (Some(State::Interface(..)), "signal") => {
                        stack.push(State::Signal(SignalBuilder::default()));
                    }
                    (Some(State::Interface(..)), "property") => {
                        stack.push(State::Property(PropertyBuilder::default()));
                    }
                    (Some(State::Method(..)), "arg") => {
                        stack.push(State::Argument(ArgumentBuilder::new(Direction::In)));
                    }
                    (Some(State::Signal(..)), "arg") => {
                        stack.push(State::Argument(ArgumentBuilder::new(Direction::Out)));
                    }
                    (
                        Some(
                            State::Interface(..)
                            | State::Method(..)
                            | State::Signal(..)
                            | State::Property(..)
                            | State::Argument(..),
                        ),
                        "annotation",
                    ) => {
                        stack.push(State::Annotation(AnnotationBuilder::default()));
                    }
                    (
                        Some(
                            State::Interface(..)
                            | State::Method(..)
                            | State::Signal(..)
                            | State::Property(..)
                            | State::Argument(..),
                        ),
                        "doc",
                    ) => {
                        stack.push(State::Doc(Doc::default()));
                    }
                    (Some(State::Doc(..)), "summary") => {
                        stack.push(State::String("summary", StringBuilder::default()));
                    }
                    (Some(State::Doc(..)), "description") => {
                        stack.push(State::Description(Description::default()));
                    }
                    (Some(State::Description(..)), "para") => {
                        stack.push(State::String("para", StringBuilder::default()));
                    }
                    (None, element) => {
                        return Err(Error::new(
                            path,
                            ErrorKind::UnsupportedElementStart(element.into()),
                        ));
                    }
                    // Foreign elements, such as `tp:docstring`, are skipped
                    // along with everything they contain.
                    (Some(..), element) => {
                        stack.push(State::Ignored(element));
                    }
                }

                if !path.is_empty() {
                    path.push('/');
                }

                path.push_str(local.as_str());
            }
            Token::ElementEnd { end, .. } => {
                let name = match end {
                    ElementEnd::Open => {
                        continue;
                    }
                    ElementEnd::Close(_, name) => Some(name.as_str()),
                    ElementEnd::Empty => None,
                };

                let Some(top) = stack.pop() else {
                    return Err(Error::new(path, ErrorKind::UnsupportedElementEnd));
                };

                match (&mut stack[..], top) {
                    ([], State::Node(builder)) => {
                        expect_end!(name, "node");
                        root = Some(builder.build_root());
                    }
                    ([.., State::Node(parent)], State::Node(builder)) => {
                        expect_end!(name, "node");
                        parent.nodes.push(build!(builder));
                    }
                    ([.., State::Node(node)], State::Interface(builder)) => {
                        expect_end!(name, "interface");
                        node.interfaces.push(build!(builder));
                    }
                    ([.., State::Interface(interface)], State::Method(builder)) => {
                        expect_end!(name, "method");
                        interface.methods.push(build!(builder));
                    }
                    ([.., State::Interface(interface)], State::Signal(builder)) => {
                        expect_end!(name, "signal");
                        interface.signals.push(build!(builder));
                    }
                    ([.., State::Interface(interface)], State::Property(builder)) => {
                        expect_end!(name, "property");
                        interface.properties.push(build!(builder));
                    }
                    ([.., State::Method(method)], State::Argument(builder)) => {
                        expect_end!(name, "arg");
                        method.arguments.push(build!(builder));
                    }
                    ([.., State::Signal(signal)], State::Argument(builder)) => {
                        expect_end!(name, "arg");
                        signal.arguments.push(build!(builder));
                    }
                    ([.., parent], State::Annotation(builder)) => {
                        expect_end!(name, "annotation");
                        let annotation = build!(builder);

                        match parent {
                            State::Interface(interface) => interface.annotations.push(annotation),
                            State::Method(method) => method.annotations.push(annotation),
                            // Annotations on other members are accepted but
                            // not retained.
                            _ => {}
                        }
                    }
                    ([.., State::Method(method)], State::Doc(doc)) => {
                        expect_end!(name, "doc");
                        method.doc = doc;
                    }
                    ([.., State::Argument(argument)], State::Doc(doc)) => {
                        expect_end!(name, "doc");
                        argument.doc = doc;
                    }
                    ([.., _], State::Doc(..)) => {
                        expect_end!(name, "doc");
                    }
                    ([.., State::Doc(doc)], State::String("summary", string)) => {
                        expect_end!(name, "summary");
                        doc.summary = string.text;
                    }
                    ([.., State::Doc(doc)], State::Description(description)) => {
                        expect_end!(name, "description");
                        doc.description = description;
                    }
                    ([.., State::Description(description)], State::String("para", string)) => {
                        expect_end!(name, "para");
                        description.paragraph = string.text;
                    }
                    (_, State::Ignored(element)) => {
                        if let Some(end) = name {
                            if end != element {
                                return Err(Error::new(
                                    path,
                                    ErrorKind::MismatchingEnd {
                                        expected: element.into(),
                                        actual: end.into(),
                                    },
                                ));
                            }
                        }
                    }
                    _ => return Err(Error::new(path, ErrorKind::UnsupportedElementEnd)),
                }

                if let Some(index) = path.rfind('/') {
                    path.truncate(index);
                } else {
                    path.clear();
                }
            }
            Token::Attribute {
                prefix,
                local,
                value,
                ..
            } => match (&mut stack[..], prefix.as_str(), local.as_str()) {
                ([.., State::Node(..)], "xmlns", _) | ([.., State::Node(..)], "", "xmlns") => {
                    // xmlns attributes are not validated.
                }
                ([.., State::Node(builder)], _, "name") => {
                    builder.name = Some(value.as_str());
                }
                ([.., State::Interface(builder)], _, "name") => {
                    builder.name = Some(value.as_str());
                }
                ([.., State::Method(builder)], _, "name") => {
                    builder.name = Some(value.as_str());
                }
                ([.., State::Signal(builder)], _, "name") => {
                    builder.name = Some(value.as_str());
                }
                ([.., State::Property(builder)], _, "name") => {
                    builder.name = Some(value.as_str());
                }
                ([.., State::Property(builder)], _, "type") => {
                    builder.ty = Some(value.as_str());
                }
                ([.., State::Property(builder)], _, "access") => {
                    builder.access = Some(match value.as_str() {
                        "read" => Access::Read,
                        "write" => Access::Write,
                        "readwrite" => Access::ReadWrite,
                        other => {
                            return Err(Error::new(
                                path,
                                ErrorKind::UnsupportedPropertyAccess(other.into()),
                            ));
                        }
                    });
                }
                ([.., State::Annotation(builder)], _, "name") => {
                    builder.name = Some(value.as_str());
                }
                ([.., State::Annotation(builder)], _, "value") => {
                    builder.value = Some(value.as_str());
                }
                ([.., State::Argument(builder)], _, "name") => {
                    builder.name = Some(value.as_str());
                }
                ([.., State::Argument(builder)], _, "direction") => {
                    builder.direction = match value.as_str() {
                        "in" => Direction::In,
                        "out" => Direction::Out,
                        other => {
                            return Err(Error::new(
                                path,
                                ErrorKind::UnsupportedArgumentDirection(other.into()),
                            ));
                        }
                    };
                }
                ([.., State::Argument(builder)], _, "type") => {
                    builder.ty = Some(value.as_str());
                }
                _ => {
                    // Unknown attributes and attributes of skipped elements.
                }
            },
            Token::Text { text } => match stack.last_mut() {
                Some(State::String(_, string)) => {
                    string.text = Some(text.as_str().trim());
                }
                Some(State::Ignored(..)) => {}
                _ => {
                    if !text.as_str().trim().is_empty() {
                        return Err(Error::new(path, ErrorKind::UnsupportedText));
                    }
                }
            },
            _ => {}
        }
    }

    if let Some(top) = stack.last() {
        return Err(Error::new(
            path,
            ErrorKind::UnterminatedElement(top.element().into()),
        ));
    }

    root.ok_or_else(|| Error::new("", ErrorKind::MissingRoot))
}

#[derive(Debug, Default)]
struct NodeBuilder<'a> {
    name: Option<&'a str>,
    interfaces: Vec<Interface<'a>>,
    nodes: Vec<&'a str>,
}

impl<'a> NodeBuilder<'a> {
    fn build_root(self) -> Node<'a> {
        Node {
            name: self.name,
            interfaces: self.interfaces.into(),
            nodes: self.nodes.into(),
        }
    }

    /// Child nodes only contribute their name to the parent.
    fn build(self) -> Result<&'a str, ErrorKind> {
        self.name.ok_or(ErrorKind::MissingNodeName)
    }
}

#[derive(Debug, Default)]
struct InterfaceBuilder<'a> {
    name: Option<&'a str>,
    methods: Vec<Method<'a>>,
    signals: Vec<Signal<'a>>,
    properties: Vec<Property<'a>>,
    annotations: Vec<Annotation<'a>>,
}

impl<'a> InterfaceBuilder<'a> {
    fn build(self) -> Result<Interface<'a>, ErrorKind> {
        let name = self.name.ok_or(ErrorKind::MissingInterfaceName)?;

        Ok(Interface {
            name,
            methods: self.methods.into(),
            signals: self.signals.into(),
            properties: self.properties.into(),
            annotations: self.annotations.into(),
        })
    }
}

#[derive(Debug, Default)]
struct MethodBuilder<'a> {
    name: Option<&'a str>,
    arguments: Vec<Argument<'a>>,
    annotations: Vec<Annotation<'a>>,
    doc: Doc<'a>,
}

impl<'a> MethodBuilder<'a> {
    fn build(self) -> Result<Method<'a>, ErrorKind> {
        let name = self.name.ok_or(ErrorKind::MissingMethodName)?;

        Ok(Method {
            name,
            arguments: self.arguments.into(),
            annotations: self.annotations.into(),
            doc: self.doc,
        })
    }
}

#[derive(Debug, Default)]
struct SignalBuilder<'a> {
    name: Option<&'a str>,
    arguments: Vec<Argument<'a>>,
}

impl<'a> SignalBuilder<'a> {
    fn build(self) -> Result<Signal<'a>, ErrorKind> {
        let name = self.name.ok_or(ErrorKind::MissingSignalName)?;

        if self.arguments.iter().any(|a| a.direction != Direction::Out) {
            return Err(ErrorKind::SignalArgumentDirection);
        }

        Ok(Signal {
            name,
            arguments: self.arguments.into(),
        })
    }
}

#[derive(Debug, Default)]
struct PropertyBuilder<'a> {
    name: Option<&'a str>,
    ty: Option<&'a str>,
    access: Option<Access>,
}

impl<'a> PropertyBuilder<'a> {
    fn build(self) -> Result<Property<'a>, ErrorKind> {
        let name = self.name.ok_or(ErrorKind::MissingPropertyName)?;
        let ty = self.ty.ok_or(ErrorKind::MissingPropertyType)?;
        let access = self.access.ok_or(ErrorKind::MissingPropertyAccess)?;
        signature::validate_single(ty)?;
        Ok(Property { name, ty, access })
    }
}

#[derive(Debug, Default)]
struct AnnotationBuilder<'a> {
    name: Option<&'a str>,
    value: Option<&'a str>,
}

impl<'a> AnnotationBuilder<'a> {
    fn build(self) -> Result<Annotation<'a>, ErrorKind> {
        let name = self.name.ok_or(ErrorKind::MissingAnnotationName)?;
        let value = self.value.ok_or(ErrorKind::MissingAnnotationValue)?;
        Ok(Annotation { name, value })
    }
}

#[derive(Debug)]
struct ArgumentBuilder<'a> {
    name: Option<&'a str>,
    ty: Option<&'a str>,
    direction: Direction,
    doc: Doc<'a>,
}

impl<'a> ArgumentBuilder<'a> {
    fn new(direction: Direction) -> Self {
        Self {
            name: None,
            ty: None,
            direction,
            doc: Doc::default(),
        }
    }

    fn build(self) -> Result<Argument<'a>, ErrorKind> {
        let ty = self.ty.ok_or(ErrorKind::MissingArgumentType)?;
        signature::validate_single(ty)?;

        Ok(Argument {
            name: self.name,
            ty,
            direction: self.direction,
            doc: self.doc,
        })
    }
}

#[derive(Debug, Default)]
struct StringBuilder<'a> {
    text: Option<&'a str>,
}

#[derive(Debug)]
enum State<'a> {
    Node(NodeBuilder<'a>),
    Interface(InterfaceBuilder<'a>),
    Method(MethodBuilder<'a>),
    Signal(SignalBuilder<'a>),
    Property(PropertyBuilder<'a>),
    Annotation(AnnotationBuilder<'a>),
    Argument(ArgumentBuilder<'a>),
    Doc(Doc<'a>),
    Description(Description<'a>),
    String(&'static str, StringBuilder<'a>),
    Ignored(&'a str),
}

impl State<'_> {
    fn element(&self) -> &str {
        match self {
            State::Node(..) => "node",
            State::Interface(..) => "interface",
            State::Method(..) => "method",
            State::Signal(..) => "signal",
            State::Property(..) => "property",
            State::Annotation(..) => "annotation",
            State::Argument(..) => "arg",
            State::Doc(..) => "doc",
            State::Description(..) => "description",
            State::String(name, _) => *name,
            State::Ignored(name) => *name,
        }
    }
}
