//! Building the node tree from segments.

use crate::error::{TemplateError, TemplateResult};
use crate::expr::{self, Expr};
use crate::syntax::{Segment, TagKind};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Emit {
        expr: Expr,
        source: String,
        line: usize,
    },
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Vec<Node>,
        line: usize,
    },
    For {
        targets: Vec<String>,
        iter: Expr,
        body: Vec<Node>,
        otherwise: Vec<Node>,
        line: usize,
    },
    Set {
        name: String,
        expr: Expr,
        line: usize,
    },
}

/// How a nested block ended.
struct End {
    keyword: String,
    rest: String,
    line: usize,
}

pub(crate) fn parse(template: &str, segments: Vec<Segment>) -> TemplateResult<Vec<Node>> {
    let mut parser = BlockParser {
        template,
        segments: segments.into_iter(),
    };
    let (nodes, end) = parser.block(&[])?;
    match end {
        None => Ok(nodes),
        Some(end) => Err(TemplateError::syntax(
            template,
            end.line,
            format!("unexpected '{}'", end.keyword),
        )),
    }
}

struct BlockParser<'a> {
    template: &'a str,
    segments: std::vec::IntoIter<Segment>,
}

impl BlockParser<'_> {
    fn err(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::syntax(self.template, line, message)
    }

    fn expr(&self, src: &str, line: usize) -> TemplateResult<Expr> {
        expr::parse_expr(src).map_err(|m| self.err(line, format!("{} in '{}'", m, src)))
    }

    /// Parse nodes until one of `terminators` or the end of input.
    fn block(&mut self, terminators: &[&str]) -> TemplateResult<(Vec<Node>, Option<End>)> {
        let mut nodes = Vec::new();

        while let Some(segment) = self.segments.next() {
            let (kind, body, line) = match segment {
                Segment::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Segment::Tag { kind, body, line } => (kind, body, line),
            };

            match kind {
                TagKind::Comment => {}
                TagKind::Expr => {
                    let expr = self.expr(&body, line)?;
                    nodes.push(Node::Emit {
                        expr,
                        source: body,
                        line,
                    });
                }
                TagKind::Block => {
                    let (keyword, rest) = split_keyword(&body);
                    match keyword {
                        "if" => nodes.push(self.if_block(rest, line)?),
                        "for" => nodes.push(self.for_block(rest, line)?),
                        "set" => {
                            let (name, expr) = expr::parse_set(rest)
                                .map_err(|m| self.err(line, format!("{} in '{}'", m, body)))?;
                            nodes.push(Node::Set { name, expr, line });
                        }
                        "elif" | "else" | "endif" | "endfor" => {
                            if terminators.contains(&keyword) {
                                return Ok((
                                    nodes,
                                    Some(End {
                                        keyword: keyword.to_string(),
                                        rest: rest.to_string(),
                                        line,
                                    }),
                                ));
                            }
                            return Err(self.err(line, format!("unexpected '{}'", keyword)));
                        }
                        "" => return Err(self.err(line, "empty block tag")),
                        other => return Err(self.err(line, format!("unknown tag '{}'", other))),
                    }
                }
            }
        }

        Ok((nodes, None))
    }

    fn if_block(&mut self, cond: &str, line: usize) -> TemplateResult<Node> {
        let mut branches = Vec::new();
        let mut otherwise = Vec::new();
        let mut cond = self.expr(cond, line)?;

        loop {
            let (body, end) = self.block(&["elif", "else", "endif"])?;
            let end = end.ok_or_else(|| self.err(line, "unclosed 'if' block"))?;
            match end.keyword.as_str() {
                "elif" => {
                    branches.push((cond, body));
                    cond = self.expr(&end.rest, end.line)?;
                }
                "else" => {
                    branches.push((cond, body));
                    let (body, end) = self.block(&["endif"])?;
                    end.ok_or_else(|| self.err(line, "unclosed 'if' block"))?;
                    otherwise = body;
                    break;
                }
                _ => {
                    branches.push((cond, body));
                    break;
                }
            }
        }

        Ok(Node::If {
            branches,
            otherwise,
            line,
        })
    }

    fn for_block(&mut self, header: &str, line: usize) -> TemplateResult<Node> {
        let (targets, iter) = expr::parse_for(header)
            .map_err(|m| self.err(line, format!("{} in 'for {}'", m, header)))?;

        let (body, end) = self.block(&["else", "endfor"])?;
        let end = end.ok_or_else(|| self.err(line, "unclosed 'for' block"))?;
        let otherwise = if end.keyword == "else" {
            let (otherwise, end) = self.block(&["endfor"])?;
            end.ok_or_else(|| self.err(line, "unclosed 'for' block"))?;
            otherwise
        } else {
            Vec::new()
        };

        Ok(Node::For {
            targets,
            iter,
            body,
            otherwise,
            line,
        })
    }
}

fn split_keyword(body: &str) -> (&str, &str) {
    match body.find(char::is_whitespace) {
        Some(idx) => (&body[..idx], body[idx..].trim()),
        None => (body, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize;

    fn parse_src(src: &str) -> TemplateResult<Vec<Node>> {
        parse("t", tokenize("t", src, Default::default())?)
    }

    #[test]
    fn test_nested_blocks() {
        let nodes = parse_src(
            "{% for s in scenarios %}{% for d in disks %}{% if d.first %}x{% else %}y{% endif %}{% endfor %}{% endfor %}",
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
        let Node::For { body, .. } = &nodes[0] else {
            panic!("expected for");
        };
        assert!(matches!(body[0], Node::For { .. }));
    }

    #[test]
    fn test_elif_chain() {
        let nodes = parse_src("{% if a %}1{% elif b %}2{% elif c %}3{% else %}4{% endif %}").unwrap();
        let Node::If { branches, otherwise, .. } = &nodes[0] else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 3);
        assert_eq!(otherwise, &vec![Node::Text("4".into())]);
    }

    #[test]
    fn test_unbalanced_blocks() {
        assert!(parse_src("{% if a %}x").unwrap_err().is_syntax());
        assert!(parse_src("x{% endif %}").unwrap_err().is_syntax());
        assert!(parse_src("{% for x in xs %}{% endif %}").unwrap_err().is_syntax());
        assert!(parse_src("{% if a %}{% else %}{% elif b %}{% endif %}").unwrap_err().is_syntax());
        assert!(parse_src("{% frobnicate %}").unwrap_err().is_syntax());
    }

    #[test]
    fn test_error_line() {
        let err = parse_src("a\nb\n{% if %}\n{% endif %}").unwrap_err();
        match err {
            TemplateError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
