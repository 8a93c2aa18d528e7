// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Recursive-descent parser for kubecypher queries
//!
//! ```text
//! query       := MATCH pattern (WHERE filters)? (RETURN projections)? ';'?
//!              | CREATE pattern ';'?
//!              | SET pattern properties ';'?
//!              | DELETE pattern ';'?
//! pattern     := node (edge node)*
//! node        := '(' IDENT ':' IDENT properties? ')'
//! edge        := '-' '[' ':' IDENT ']' '->'
//! properties  := '{' PATH ':' value (',' PATH ':' value)* '}'
//! filters     := filter ((AND | ',') filter)*
//! filter      := PATH ('=' | '!=') value
//! projections := PATH (',' PATH)*
//! ```
//!
//! The parser pulls tokens from the lexer one at a time with a single token
//! of lookahead. The first error ends the parse.

use log::debug;

use super::ast::*;
use super::lexer::{Lexer, Span, SpannedToken, Token};
use super::pretty_printer::pretty_print_query;
use crate::graph::{Edge, Graph, GraphError, Node};

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParserError {
    #[error("Illegal character '{ch}' at {span}")]
    IllegalCharacter { ch: char, span: Span },
    #[error("Unexpected {found} at {span}, expected {expected}")]
    UnexpectedToken {
        found: Token,
        expected: String,
        span: Span,
    },
    #[error("Unexpected end of input at {span}, expected {expected}")]
    UnexpectedEof { expected: String, span: Span },
    #[error("Empty field path at {span}")]
    EmptyPath { span: Span },
    #[error("Invalid integer '{text}' at {span}")]
    InvalidInteger { text: String, span: Span },
    #[error("Binding '{name}' is bound to both {first} and {second}")]
    ConflictingBinding {
        name: String,
        first: String,
        second: String,
    },
    #[error("Empty query")]
    EmptyQuery,
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

impl ParserError {
    /// Position of the offending token, when there is one
    pub fn span(&self) -> Option<Span> {
        match self {
            ParserError::IllegalCharacter { span, .. }
            | ParserError::UnexpectedToken { span, .. }
            | ParserError::UnexpectedEof { span, .. }
            | ParserError::EmptyPath { span }
            | ParserError::InvalidInteger { span, .. } => Some(*span),
            _ => None,
        }
    }
}

/// Parse a query string into a [`Query`]
pub fn parse_query(input: &str) -> Result<Query, ParserError> {
    debug!("PARSER: parsing {:?}", input.trim());
    let mut parser = Parser::new(input);
    let query = parser.query()?;
    pretty_print_query(&query);
    Ok(query)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: SpannedToken,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    fn query(&mut self) -> Result<Query, ParserError> {
        let mut graph = Graph::new();
        let clause = match self.current.token {
            Token::Match => {
                self.bump();
                self.pattern(&mut graph)?;
                let filters = if self.eat(&Token::Where) {
                    self.filters()?
                } else {
                    Vec::new()
                };
                let projections = if self.eat(&Token::Return) {
                    self.projections()?
                } else {
                    Vec::new()
                };
                Clause::Match {
                    filters,
                    projections,
                }
            }
            Token::Create => {
                self.bump();
                self.pattern(&mut graph)?;
                Clause::Create
            }
            Token::Set => {
                self.bump();
                self.pattern(&mut graph)?;
                if self.current.token != Token::LeftBrace {
                    return Err(self.unexpected("'{' opening the SET assignments"));
                }
                let assignments = self.properties()?;
                Clause::Set { assignments }
            }
            Token::Delete => {
                self.bump();
                self.pattern(&mut graph)?;
                Clause::Delete
            }
            Token::EOF => return Err(ParserError::EmptyQuery),
            _ => return Err(self.unexpected("MATCH, CREATE, SET or DELETE")),
        };

        self.eat(&Token::Semicolon);
        if self.current.token != Token::EOF {
            return Err(self.unexpected("end of query"));
        }
        Ok(Query { graph, clause })
    }

    fn pattern(&mut self, graph: &mut Graph) -> Result<(), ParserError> {
        self.chain(graph)?;
        while self.eat(&Token::Comma) {
            self.chain(graph)?;
        }
        Ok(())
    }

    fn chain(&mut self, graph: &mut Graph) -> Result<(), ParserError> {
        let mut previous = self.node(graph)?;
        while self.current.token == Token::Dash {
            let edge_type = self.edge()?;
            let next = self.node(graph)?;
            graph.add_edge(Edge::new(previous, next.clone(), edge_type))?;
            previous = next;
        }
        Ok(())
    }

    fn node(&mut self, graph: &mut Graph) -> Result<String, ParserError> {
        self.expect(Token::LeftParen, "'(' starting a node")?;
        let name = self.identifier("binding name")?;
        self.expect(Token::Colon, "':' between binding and kind")?;
        let kind = self.identifier("resource kind")?;
        let properties = if self.current.token == Token::LeftBrace {
            self.properties()?
        } else {
            Vec::new()
        };
        self.expect(Token::RightParen, "')' closing the node")?;

        if let Some(existing) = graph.node_by_binding(&name) {
            if existing.kind != kind {
                return Err(ParserError::ConflictingBinding {
                    name,
                    first: existing.kind.clone(),
                    second: kind,
                });
            }
        }
        Ok(graph.add_node(Node::new(name, kind).with_properties(properties)))
    }

    fn edge(&mut self) -> Result<String, ParserError> {
        self.expect(Token::Dash, "'-'")?;
        self.expect(Token::LeftBracket, "'[' starting a relationship")?;
        self.expect(Token::Colon, "':' before the relationship type")?;
        let edge_type = self.identifier("relationship type")?;
        self.expect(Token::RightBracket, "']' closing the relationship")?;
        self.expect(Token::Arrow, "'->'")?;
        Ok(edge_type)
    }

    fn properties(&mut self) -> Result<Vec<Property>, ParserError> {
        self.expect(Token::LeftBrace, "'{'")?;
        let mut properties = Vec::new();

        // `{}` lexes as an empty path followed by the closing brace
        if matches!(&self.current.token, Token::PathLiteral(p) if p.is_empty()) {
            self.bump();
            self.expect(Token::RightBrace, "property name or '}'")?;
            return Ok(properties);
        }

        loop {
            let key = unquote(&self.path("property name")?);
            self.expect(Token::Colon, "':' after property name")?;
            let value = self.literal()?;
            properties.push(Property::new(key, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RightBrace, "',' or '}'")?;
        Ok(properties)
    }

    fn filters(&mut self) -> Result<Vec<Filter>, ParserError> {
        let mut filters = Vec::new();
        loop {
            let path = self.path("field path")?;
            let operator = match self.current.token {
                Token::Equal => FilterOperator::Equal,
                Token::NotEqual => FilterOperator::NotEqual,
                _ => return Err(self.unexpected("'=' or '!='")),
            };
            self.bump();
            let value = self.literal()?;
            filters.push(Filter {
                path,
                operator,
                value,
            });
            if !(self.eat(&Token::And) || self.eat(&Token::Comma)) {
                return Ok(filters);
            }
        }
    }

    fn projections(&mut self) -> Result<Vec<String>, ParserError> {
        let mut projections = vec![self.path("field path")?];
        while self.eat(&Token::Comma) {
            projections.push(self.path("field path")?);
        }
        Ok(projections)
    }

    fn literal(&mut self) -> Result<Literal, ParserError> {
        let literal = match &self.current.token {
            Token::String(s) => Literal::String(s.clone()),
            Token::Boolean(b) => Literal::Boolean(*b),
            Token::Integer(text) => {
                let value = text.parse::<i64>().map_err(|_| ParserError::InvalidInteger {
                    text: text.clone(),
                    span: self.current.span,
                })?;
                Literal::Integer(value)
            }
            _ => return Err(self.unexpected("string, integer or boolean")),
        };
        self.bump();
        Ok(literal)
    }

    fn identifier(&mut self, expected: &str) -> Result<String, ParserError> {
        match &self.current.token {
            Token::Identifier(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn path(&mut self, expected: &str) -> Result<String, ParserError> {
        match &self.current.token {
            Token::PathLiteral(path) if path.is_empty() => Err(ParserError::EmptyPath {
                span: self.current.span,
            }),
            Token::PathLiteral(path) => {
                let path = path.clone();
                self.bump();
                Ok(path)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn bump(&mut self) -> SpannedToken {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if &self.current.token == token {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), ParserError> {
        if self.current.token == token {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParserError {
        let span = self.current.span;
        match &self.current.token {
            Token::Illegal(ch) => ParserError::IllegalCharacter { ch: *ch, span },
            Token::EOF => ParserError::UnexpectedEof {
                expected: expected.to_string(),
                span,
            },
            found => ParserError::UnexpectedToken {
                found: found.clone(),
                expected: expected.to_string(),
                span,
            },
        }
    }
}

/// `"name"` and `name` are the same property key
fn unquote(key: &str) -> String {
    if key.len() >= 2 && key.starts_with('"') && key.ends_with('"') && !key[1..key.len() - 1].contains('"') {
        key[1..key.len() - 1].to_string()
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_with_return() {
        let query = parse_query("MATCH (d:Deployment) RETURN d.metadata.name, d.spec.replicas").unwrap();
        assert_eq!(query.graph.nodes.len(), 1);
        assert_eq!(query.graph.nodes[0].id, "Deployment/d");
        assert_eq!(
            query.clause,
            Clause::Match {
                filters: vec![],
                projections: vec!["d.metadata.name".into(), "d.spec.replicas".into()],
            }
        );
        assert!(!query.is_mutation());
    }

    #[test]
    fn test_node_properties() {
        let query =
            parse_query(r#"match (d:Deployment{name: "web", replicas: 2, "paused": false});"#).unwrap();
        let node = &query.graph.nodes[0];
        assert_eq!(node.property("name"), Some(&Literal::String("web".into())));
        assert_eq!(node.property("replicas"), Some(&Literal::Integer(2)));
        assert_eq!(node.property("paused"), Some(&Literal::Boolean(false)));
    }

    #[test]
    fn test_empty_property_block() {
        let query = parse_query("MATCH (p:Pod {})").unwrap();
        assert!(query.graph.nodes[0].properties.is_empty());
    }

    #[test]
    fn test_edges() {
        let query =
            parse_query("MATCH (d:Deployment)-[:OWN]->(rs:ReplicaSet)-[:OWN]->(p:Pod) RETURN p")
                .unwrap();
        assert_eq!(query.graph.nodes.len(), 3);
        assert_eq!(
            query.graph.edges,
            vec![
                Edge::new("Deployment/d", "ReplicaSet/rs", "OWN"),
                Edge::new("ReplicaSet/rs", "Pod/p", "OWN"),
            ]
        );
    }

    #[test]
    fn test_repeated_node_collapses() {
        let query = parse_query("MATCH (a:Pod)-[:X]->(s:Service)-[:Y]->(a:Pod)").unwrap();
        assert_eq!(query.graph.nodes.len(), 2);
        assert_eq!(query.graph.edges.len(), 2);
    }

    #[test]
    fn test_comma_separated_chains() {
        let query = parse_query(
            "MATCH (d:Deployment)-[:OWN]->(rs:ReplicaSet), (s:Service)-[:EXPOSE]->(p:Pod) RETURN d, p",
        )
        .unwrap();
        assert_eq!(query.graph.bindings(), vec!["d", "rs", "s", "p"]);
        assert_eq!(query.graph.edges.len(), 2);
        assert!(parse_query("MATCH (d:Deployment),").is_err());
    }

    #[test]
    fn test_conflicting_binding() {
        let err = parse_query("MATCH (a:Pod)-[:X]->(a:Service)").unwrap_err();
        assert!(matches!(err, ParserError::ConflictingBinding { .. }));
    }

    #[test]
    fn test_where_clause() {
        let query = parse_query(
            r#"MATCH (d:Deployment) WHERE d.metadata.labels.app = "web" AND d.spec.replicas != 3 RETURN d"#,
        )
        .unwrap();
        let Clause::Match { filters, projections } = query.clause else {
            panic!("expected MATCH");
        };
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].path, "d.metadata.labels.app");
        assert_eq!(filters[1].operator, FilterOperator::NotEqual);
        assert_eq!(filters[1].value, Literal::Integer(3));
        assert_eq!(projections, vec!["d".to_string()]);
    }

    #[test]
    fn test_mutations() {
        let create = parse_query(r#"CREATE (d:Deployment {name: "web"})"#).unwrap();
        assert_eq!(create.clause, Clause::Create);
        assert!(create.is_mutation());

        let set = parse_query(r#"SET (d:Deployment {name: "web"}) {spec.replicas: 5}"#).unwrap();
        assert_eq!(
            set.clause,
            Clause::Set {
                assignments: vec![Property::new("spec.replicas", Literal::Integer(5))]
            }
        );

        let delete = parse_query(r#"DELETE (d:Deployment {name: "web"});"#).unwrap();
        assert_eq!(delete.clause, Clause::Delete);
    }

    #[test]
    fn test_set_requires_assignments() {
        let err = parse_query(r#"SET (d:Deployment {name: "web"})"#).unwrap_err();
        assert!(matches!(err, ParserError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_illegal_character_has_position() {
        let err = parse_query("MATCH (d:Deployment) @").unwrap_err();
        assert_eq!(
            err,
            ParserError::IllegalCharacter {
                ch: '@',
                span: Span { offset: 21, line: 1, column: 22 }
            }
        );
    }

    #[test]
    fn test_first_error_aborts() {
        let err = parse_query("MATCH (d Deployment)").unwrap_err();
        match err {
            ParserError::UnexpectedToken { found, .. } => {
                assert_eq!(found, Token::Identifier("Deployment".into()))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_kind_and_trailing_garbage() {
        assert!(parse_query("MATCH (d)").is_err());
        assert!(parse_query("MATCH (d:Pod) (e:Pod)").is_err());
        assert!(parse_query("RETURN d").is_err());
        assert_eq!(parse_query("   ").unwrap_err(), ParserError::EmptyQuery);
    }

    #[test]
    fn test_empty_projection() {
        let err = parse_query("MATCH (d:Pod) RETURN").unwrap_err();
        assert!(matches!(err, ParserError::EmptyPath { .. }));
    }

    #[test]
    fn test_illegal_character_where_a_path_is_expected() {
        let err = parse_query("MATCH (d:Pod) RETURN @x").unwrap_err();
        assert!(matches!(err, ParserError::IllegalCharacter { ch: '@', .. }));

        let err = parse_query("MATCH (p:Pod {@k: 1})").unwrap_err();
        assert!(matches!(err, ParserError::IllegalCharacter { ch: '@', .. }));
    }

    #[test]
    fn test_integer_overflow() {
        let err = parse_query("MATCH (d:Pod {n: 99999999999999999999})").unwrap_err();
        assert!(matches!(err, ParserError::InvalidInteger { .. }));
    }

    #[test]
    fn test_keyword_named_binding() {
        let query = parse_query("MATCH (Match:Pod) RETURN Match.metadata.name").unwrap();
        assert_eq!(query.graph.nodes[0].name, "Match");
    }
}
