/// A D-Bus node.
#[derive(Debug, Default)]
pub struct Node<'a> {
    /// The name of the node, if specified.
    pub name: Option<&'a str>,
    /// Interfaces in the node, in declaration order.
    pub interfaces: Box<[Interface<'a>]>,
    /// Names of child nodes.
    pub nodes: Box<[&'a str]>,
}

/// A single interface.
#[derive(Debug, Clone)]
pub struct Interface<'a> {
    /// The name of the interface.
    pub name: &'a str,
    /// Methods associated with the interface.
    pub methods: Box<[Method<'a>]>,
    /// Signals associated with the interface.
    pub signals: Box<[Signal<'a>]>,
    /// Properties associated with the interface.
    pub properties: Box<[Property<'a>]>,
    /// Annotations on the interface.
    pub annotations: Box<[Annotation<'a>]>,
}

impl<'a> Interface<'a> {
    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&Method<'a>> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// The direction of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Input argument.
    In,
    /// Output argument.
    Out,
}

/// A method argument.
#[derive(Debug, Clone, Copy)]
pub struct Argument<'a> {
    /// The name of the argument.
    pub name: Option<&'a str>,
    /// The type of the argument.
    pub ty: &'a str,
    /// The direction of an argument.
    pub direction: Direction,
    /// Documentation of the argument.
    pub doc: Doc<'a>,
}

/// A single method.
#[derive(Debug, Clone)]
pub struct Method<'a> {
    /// The name of the method.
    pub name: &'a str,
    /// Arguments to the method.
    pub arguments: Box<[Argument<'a>]>,
    /// Annotations on the method.
    pub annotations: Box<[Annotation<'a>]>,
    /// Documentation of the method.
    pub doc: Doc<'a>,
}

impl Method<'_> {
    /// The concatenated signature of all input arguments.
    pub fn in_signature(&self) -> String {
        self.signature(Direction::In)
    }

    /// The concatenated signature of all output arguments.
    pub fn out_signature(&self) -> String {
        self.signature(Direction::Out)
    }

    fn signature(&self, direction: Direction) -> String {
        self.arguments
            .iter()
            .filter(|a| a.direction == direction)
            .map(|a| a.ty)
            .collect()
    }
}

/// A single signal.
#[derive(Debug, Clone)]
pub struct Signal<'a> {
    /// The name of the signal.
    pub name: &'a str,
    /// Arguments carried by the signal.
    pub arguments: Box<[Argument<'a>]>,
}

/// Access mode of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// A single property.
#[derive(Debug, Clone, Copy)]
pub struct Property<'a> {
    /// The name of the property.
    pub name: &'a str,
    /// The type of the property.
    pub ty: &'a str,
    /// How the property may be accessed.
    pub access: Access,
}

/// An annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annotation<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// Documentation associated with an element.
#[derive(Debug, Default, Clone, Copy)]
pub struct Doc<'a> {
    /// Documentation summary.
    pub summary: Option<&'a str>,
    /// Description.
    pub description: Description<'a>,
}

/// The description of an element.
#[derive(Debug, Default, Clone, Copy)]
pub struct Description<'a> {
    /// Paragraph describing an element.
    pub paragraph: Option<&'a str>,
}
