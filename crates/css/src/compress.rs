//! Rule compressor
//!
//! Collects declaration blocks per selector, merges duplicate and
//! overlapping rules, orders rules by specificity where that is safe, and
//! re-emits a token sequence. At-rule blocks carry their own context on an
//! explicit stack instead of mutating shared options.

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};
use squeegee_scan::TemplateConfig;

use crate::config;
use crate::error::{CssError, CssResult};
use crate::selector::{SelectorAnalysis, SelectorScanner};
use crate::serialize;
use crate::token::{PropertyDetail, Token, TokenDetail, TokenKind, ValueDetail};
use crate::tokenizer::{CssTokenizer, TokenizerOptions};
use crate::value;

/// Compressor configuration; defaults match the most aggressive safe setup
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Drop comments except `/*! ... */`
    pub remove_comment: bool,
    /// Drop the semicolon after the last declaration of a block
    pub remove_last_semicolon: bool,
    /// Drop rules whose declaration block is empty
    pub remove_empty_selector: bool,
    /// Later declarations of a property replace earlier ones
    pub override_same_property: bool,
    /// Apply the value shorthand tables
    pub short_value: bool,
    /// Collapse margin/padding longhand children into the shorthand
    pub merge_property: bool,
    /// Order declarations by property name where provably safe
    pub sort_property: bool,
    /// Order rules by specificity
    pub sort_selector: bool,
    /// Rules per sorting chunk; bounds the quadratic comparison sort
    pub sort_selector_chunk: usize,
    /// Merge rules with shared declarations into comma selectors
    pub merge_selector: bool,
    /// Lowercase property names
    pub property_to_lower: bool,
    pub template: Option<TemplateConfig>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            remove_comment: true,
            remove_last_semicolon: true,
            remove_empty_selector: true,
            override_same_property: true,
            short_value: true,
            merge_property: true,
            sort_property: true,
            sort_selector: true,
            sort_selector_chunk: 50,
            merge_selector: true,
            property_to_lower: true,
            template: None,
        }
    }
}

/// One declaration; `property` is absent for placeholder-only and hack
/// entries
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: Option<Token>,
    pub value: Token,
}

/// Ordered declaration-key → declaration mapping with unique keys
///
/// Keys are normally the lowercased property name; a positional suffix is
/// appended when two declarations must both be retained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationBlock {
    entries: Vec<(String, Declaration)>,
}

impl DeclarationBlock {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&Declaration> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, d)| d)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Declaration> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, d)| d)
    }

    /// Append, assuming the key is not present
    pub fn push(&mut self, key: String, declaration: Declaration) {
        self.entries.push((key, declaration));
    }

    pub fn remove(&mut self, key: &str) -> Option<Declaration> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Insert under the override policy: the new declaration replaces an
    /// existing one (moving to the end) unless the existing one is
    /// `!important` and the new one is not
    pub fn merge(&mut self, key: String, declaration: Declaration) {
        if let Some(existing) = self.get(&key) {
            let existing_important = existing.value.is_important();
            let new_important = declaration.value.is_important();
            if !existing_important || new_important {
                self.remove(&key);
                self.push(key, declaration);
            }
        } else {
            self.push(key, declaration);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, Declaration)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn into_entries(self) -> Vec<(String, Declaration)> {
        self.entries
    }

    pub fn from_entries(entries: Vec<(String, Declaration)>) -> Self {
        Self { entries }
    }
}

/// One collected rule: a selector (carrying its analysis) plus its block
#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: Token,
    pub attrs: DeclarationBlock,
    /// Original source position, the sort tiebreaker
    pub pos: usize,
}

/// Per-block compression context, pushed when an at-rule block opens
#[derive(Debug, Clone)]
struct CompressContext {
    sort_selector: bool,
    sort_property: bool,
    merge_selector: bool,
    /// Inside `@keyframes`/`@media`/`@supports`/`@-moz-document`: rule
    /// "selectors" there must be neither specificity-sorted nor merged
    suppress: bool,
}

impl CompressContext {
    fn from_options(options: &CompressOptions) -> Self {
        Self {
            sort_selector: options.sort_selector,
            sort_property: options.sort_property,
            merge_selector: options.merge_selector,
            suppress: false,
        }
    }
}

/// Stylesheet compressor over a token sequence
pub struct Compressor {
    options: CompressOptions,
    tokens: Vec<Token>,
    index: usize,
    result: Vec<Token>,
    rules: Vec<Rule>,
    rule_index: FxHashMap<String, usize>,
    selector_pos: usize,
}

impl Compressor {
    /// Tokenize `text` and prepare a compressor over it
    pub fn from_text(text: &str, options: CompressOptions) -> CssResult<Self> {
        let tokenizer_options = TokenizerOptions {
            parse_selector: true,
            template: options.template.clone(),
        };
        let tokens = CssTokenizer::new(text, tokenizer_options).run()?;
        Ok(Self::from_tokens(tokens, options))
    }

    /// Reuse an existing token sequence (e.g. from an embedding caller)
    pub fn from_tokens(tokens: Vec<Token>, options: CompressOptions) -> Self {
        Self {
            options,
            tokens,
            index: 0,
            result: Vec::new(),
            rules: Vec::new(),
            rule_index: FxHashMap::default(),
            selector_pos: 0,
        }
    }

    /// Compress and serialize
    pub fn run(self) -> CssResult<String> {
        let tokens = self.run_tokens()?;
        Ok(serialize::tokens_to_text(&tokens, &[]))
    }

    /// Compress, returning the final token sequence for re-embedding
    pub fn run_tokens(mut self) -> CssResult<Vec<Token>> {
        let base = CompressContext::from_options(&self.options);
        let mut context = base.clone();
        let mut stack: Vec<CompressContext> = Vec::new();
        let mut next_block_suppress = false;
        let mut has_charset = false;
        let mut property = String::new();

        while self.index < self.tokens.len() {
            let mut token = self.tokens[self.index].clone();
            self.index += 1;
            self.filter_comments(&mut token);
            match token.kind {
                TokenKind::Selector => {
                    let pos = self.selector_pos;
                    self.selector_pos += 1;
                    self.collect_rule(token, pos, &context)?;
                }
                TokenKind::Value => {
                    // bare values occur inside declaration-style at blocks
                    if let Some(detail) = token.value_detail() {
                        let mut detail = detail.clone();
                        detail.value = value::compress_value(
                            &detail.value,
                            &property,
                            self.options.short_value,
                        );
                        token.detail = TokenDetail::Value(detail);
                    }
                    self.result.push(token);
                }
                TokenKind::LeftBrace => {
                    stack.push(context.clone());
                    if next_block_suppress {
                        context.suppress = true;
                        next_block_suppress = false;
                    }
                    self.result.push(token);
                }
                TokenKind::RightBrace => {
                    let double = self.index >= 2
                        && self.tokens[self.index - 2].kind == TokenKind::RightBrace;
                    if double {
                        self.flush_rules(&context)?;
                    }
                    context = stack.pop().unwrap_or_else(|| base.clone());
                    self.result.push(token);
                }
                TokenKind::Template => {
                    self.flush_rules(&context)?;
                    let drop = match (&self.options.template, token.template_detail()) {
                        (Some(template), Some(detail)) => template.is_comment(&detail.body),
                        _ => false,
                    };
                    if !drop {
                        self.result.push(token);
                    }
                }
                TokenKind::Property => {
                    if let Some(detail) = token.property_detail() {
                        property = detail.value.clone();
                    }
                    self.result.push(token);
                }
                kind if kind.is_at() => {
                    self.flush_rules(&context)?;
                    if kind.opens_rule_block() {
                        next_block_suppress = true;
                    }
                    if kind == TokenKind::AtCharset {
                        if !has_charset {
                            self.result.push(token);
                        }
                        has_charset = true;
                    } else {
                        self.result.push(token);
                    }
                }
                _ => self.result.push(token),
            }
        }
        self.flush_rules(&context)?;
        log::debug!("compressed into {} tokens", self.result.len());
        Ok(self.result)
    }

    fn filter_comments(&self, token: &mut Token) {
        if !self.options.remove_comment {
            return;
        }
        token.comments_before.retain(|c| c.is_preserved());
    }

    /// Collect one selector's block; rules with identical serialized
    /// selector text unify immediately
    fn collect_rule(
        &mut self,
        mut selector: Token,
        pos: usize,
        context: &CompressContext,
    ) -> CssResult<()> {
        let attrs = self.collect_block(&selector, context)?;
        if self.options.remove_empty_selector && attrs.is_empty() {
            return Ok(());
        }
        if selector.selector_analysis().is_none() {
            let analysis =
                SelectorScanner::new(&selector.value, self.options.template.clone()).run()?;
            selector.detail = TokenDetail::Selector(analysis);
        }
        let key = serialize::selector_text(&selector);
        selector.value = key.clone();
        if let Some(&existing) = self.rule_index.get(&key) {
            for (k, declaration) in attrs.into_entries() {
                self.rules[existing].attrs.merge(k, declaration);
            }
        } else {
            self.rule_index.insert(key, self.rules.len());
            self.rules.push(Rule { selector, attrs, pos });
        }
        Ok(())
    }

    /// Parse the declarations of one brace-delimited block
    fn collect_block(
        &mut self,
        selector: &Token,
        context: &CompressContext,
    ) -> CssResult<DeclarationBlock> {
        let brace = match self.tokens.get(self.index) {
            Some(token) => token.clone(),
            None => return Ok(DeclarationBlock::default()),
        };
        self.index += 1;
        if brace.kind != TokenKind::LeftBrace {
            return Err(CssError::missing_block_start(selector.span.end));
        }

        let mut attrs = DeclarationBlock::default();
        let mut pos_counter = 0usize;
        let mut key = String::new();
        let mut property_token: Option<Token> = None;
        let mut value_token: Option<Token> = None;
        let mut template_pending: Option<Token> = None;
        let mut has_template = false;
        let mut has_hack = false;

        'block: while self.index < self.tokens.len() {
            let mut token = self.tokens[self.index].clone();
            self.index += 1;
            self.filter_comments(&mut token);
            let kind = token.kind;
            match kind {
                TokenKind::Property => {
                    let text = if self.options.property_to_lower {
                        token.value.to_lowercase()
                    } else {
                        token.value.clone()
                    };
                    key.push_str(&text);
                    if !self.options.override_same_property && attrs.contains_key(&key) {
                        key.push_str(&pos_counter.to_string());
                        pos_counter += 1;
                    }
                    if self.options.property_to_lower {
                        token.value = token.value.to_lowercase();
                    }
                    property_token = Some(token);
                    if let Some(tpl) = template_pending.take() {
                        attrs.push(
                            format!("{}%{}", tpl.value, pos_counter),
                            Declaration { property: None, value: tpl },
                        );
                        pos_counter += 1;
                    }
                }
                TokenKind::Value => {
                    let mut token = token;
                    if let Some(tpl) = template_pending.take() {
                        token.value = format!("{}{}", tpl.value, token.value);
                        if let Some(detail) = token.value_detail_mut() {
                            detail.value = format!("{}{}", tpl.value, detail.value);
                        }
                    }
                    value_token = Some(token);
                }
                TokenKind::Semicolon | TokenKind::RightBrace => {
                    let closing = kind == TokenKind::RightBrace;
                    if value_token.is_none()
                        && template_pending.is_some()
                        && property_token.is_some()
                    {
                        value_token = template_pending.take();
                    }
                    if let Some(tpl) = template_pending.take() {
                        attrs.push(
                            format!("{}%{}", tpl.value, pos_counter),
                            Declaration { property: None, value: tpl },
                        );
                        pos_counter += 1;
                    }
                    let (prop, mut value) = match (property_token.take(), value_token.take()) {
                        (Some(p), Some(v)) => (p, v),
                        (p, v) => {
                            property_token = p;
                            value_token = v;
                            if closing {
                                break 'block;
                            }
                            continue;
                        }
                    };
                    if prop.kind == TokenKind::Template {
                        attrs.push(
                            format!("{}%{}", prop.value, pos_counter),
                            Declaration { property: Some(prop), value },
                        );
                        pos_counter += 1;
                        if closing {
                            break 'block;
                        }
                        continue;
                    }
                    if value.kind == TokenKind::Value {
                        let property_name = prop
                            .property_detail()
                            .map(|d| d.value.clone())
                            .unwrap_or_default();
                        if let Some(detail) = value.value_detail() {
                            let mut detail = detail.clone();
                            detail.value = value::compress_value(
                                &detail.value,
                                &property_name,
                                self.options.short_value,
                            );
                            let suffix = detail.suffix.clone();
                            value.detail = TokenDetail::Value(detail);
                            // a suffixed declaration must not silently
                            // override the unsuffixed one
                            key.push_str(&suffix);
                        }
                    }
                    if config::is_multi_same_property(&key, &value.value) {
                        key.push_str(&format!("%{}", pos_counter));
                        pos_counter += 1;
                    }
                    if has_template {
                        key.push_str(&format!("%{}", pos_counter));
                        pos_counter += 1;
                    }
                    let declaration = Declaration { property: Some(prop), value };
                    let entry_key = std::mem::take(&mut key);
                    if self.options.override_same_property {
                        attrs.merge(entry_key, declaration);
                    } else {
                        attrs.push(entry_key, declaration);
                    }
                    if closing {
                        break 'block;
                    }
                }
                TokenKind::BracketHack => {
                    attrs.push(
                        format!("{}%{}", token.value, pos_counter),
                        Declaration { property: None, value: token },
                    );
                    pos_counter += 1;
                    has_hack = true;
                }
                TokenKind::Template => {
                    if let Some(prev) = template_pending.replace(token) {
                        attrs.push(
                            format!("{}%{}", prev.value, pos_counter),
                            Declaration { property: None, value: prev },
                        );
                        pos_counter += 1;
                    }
                    has_template = true;
                }
                TokenKind::Colon => {
                    if property_token.is_none() {
                        if let Some(tpl) = template_pending.take() {
                            property_token = Some(tpl);
                        }
                    }
                }
                _ => {}
            }
        }

        if !has_hack && !has_template {
            if context.sort_property && !context.suppress {
                attrs = sort_properties(attrs);
            }
            if self.options.merge_property {
                attrs = merge_property_children(attrs, "padding");
                attrs = merge_property_children(attrs, "margin");
            }
        }
        Ok(attrs)
    }

    /// Sort, batch and merge the collected rules, then emit their tokens
    fn flush_rules(&mut self, context: &CompressContext) -> CssResult<()> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let mut rules = std::mem::take(&mut self.rules);
        self.rule_index.clear();

        if context.sort_selector && !context.suppress && rules.len() > 1 {
            let chunk = self.options.sort_selector_chunk.max(1);
            for chunk_rules in rules.chunks_mut(chunk) {
                sort_rules(chunk_rules);
            }
        }

        let merge = context.merge_selector && !context.suppress;
        let mut result: Vec<Rule> = Vec::new();
        let mut batch: Vec<Rule> = Vec::new();
        for rule in rules {
            if rule_specificity_equal(&rule) {
                batch.push(rule);
            } else {
                let drained = std::mem::take(&mut batch);
                let drained = if merge { reduce_intersections(drained) } else { drained };
                result.extend(drained);
                result.push(rule);
            }
        }
        if !batch.is_empty() {
            let drained = if merge { reduce_intersections(batch) } else { batch };
            result.extend(drained);
        }

        let tokens = self.rules_to_tokens(result);
        self.result.extend(tokens);
        Ok(())
    }

    fn rules_to_tokens(&self, rules: Vec<Rule>) -> Vec<Token> {
        let left_brace = Token::synthetic(TokenKind::LeftBrace, "{");
        let right_brace = Token::synthetic(TokenKind::RightBrace, "}");
        let colon = Token::synthetic(TokenKind::Colon, ":");
        let semicolon = Token::synthetic(TokenKind::Semicolon, ";");
        let mut out = Vec::new();
        for rule in rules {
            let mut selector = rule.selector;
            dedupe_alternatives(&mut selector);
            out.push(selector);
            out.push(left_brace.clone());
            let entries = rule.attrs.into_entries();
            let count = entries.len();
            for (index, (_, declaration)) in entries.into_iter().enumerate() {
                let keep_semicolon = !self.options.remove_last_semicolon
                    || index + 1 < count
                    || declaration.value.kind == TokenKind::Template;
                if let Some(property) = declaration.property {
                    out.push(property);
                    out.push(colon.clone());
                }
                out.push(declaration.value);
                if keep_semicolon {
                    out.push(semicolon.clone());
                }
            }
            out.push(right_brace.clone());
        }
        out
    }
}

fn analysis_of(rule: &Rule) -> Option<&SelectorAnalysis> {
    rule.selector.selector_analysis()
}

fn rule_specificity_equal(rule: &Rule) -> bool {
    analysis_of(rule)
        .map(|a| a.specificity_equal && !a.invalid)
        .unwrap_or(false)
}

/// Stable, memoized comparison sort by specificity
///
/// Specificity is only a partial order: overlapping ranges fall back to
/// source order, and a swap is applied only while consistent with every rule
/// already placed between the two positions.
fn sort_rules(rules: &mut [Rule]) {
    fn compare(a: &Rule, b: &Rule) -> Ordering {
        let sa = match analysis_of(a) {
            Some(s) => s,
            None => return a.pos.cmp(&b.pos),
        };
        let sb = match analysis_of(b) {
            Some(s) => s,
            None => return a.pos.cmp(&b.pos),
        };
        if sa.invalid || sb.invalid {
            return a.pos.cmp(&b.pos);
        }
        if !sa.specificity_equal || !sb.specificity_equal {
            if sa.min_specificity > sb.max_specificity {
                return Ordering::Greater;
            }
            if sa.max_specificity < sb.min_specificity {
                return Ordering::Less;
            }
            return a.pos.cmp(&b.pos);
        }
        if sa.min_specificity == sb.min_specificity {
            return a.pos.cmp(&b.pos);
        }
        sa.min_specificity.cmp(&sb.min_specificity)
    }

    fn cached_compare(
        cache: &mut FxHashMap<(usize, usize), Ordering>,
        rules: &[Rule],
        i: usize,
        j: usize,
    ) -> Ordering {
        *cache.entry((i, j)).or_insert_with(|| compare(&rules[i], &rules[j]))
    }

    let len = rules.len();
    let mut cache: FxHashMap<(usize, usize), Ordering> = FxHashMap::default();
    for i in 0..len {
        for j in (i + 1)..len {
            if cached_compare(&mut cache, rules, i, j) != Ordering::Greater {
                continue;
            }
            let mut consistent = true;
            for k in (i + 1)..j {
                if cached_compare(&mut cache, rules, k, j) == Ordering::Less {
                    consistent = false;
                    break;
                }
            }
            if consistent {
                rules.swap(i, j);
            }
        }
    }
}

/// Repeatedly merge adjacent same-specificity rules through their
/// declaration intersection until no pair can be combined
fn reduce_intersections(mut rules: Vec<Rule>) -> Vec<Rule> {
    loop {
        let len = rules.len();
        if len < 2 {
            break;
        }
        let mut out: Vec<Rule> = Vec::new();
        let mut changed = false;
        for index in 0..len - 1 {
            let assoc = if can_combine(&rules[index], &rules[index + 1]) {
                properties_intersect(&rules[index], &rules[index + 1])
            } else {
                None
            };
            if let Some(assoc) = assoc {
                let keys: Vec<String> = assoc.keys().cloned().collect();
                for key in &keys {
                    rules[index].attrs.remove(key);
                    rules[index + 1].attrs.remove(key);
                }
                changed = true;
                let selector = assoc_selector(&rules[index].selector, &rules[index + 1].selector);
                out.push(Rule { selector, attrs: assoc, pos: rules[index].pos });
            }
            if !rules[index].attrs.is_empty() {
                out.push(rules[index].clone());
            }
        }
        if !rules[len - 1].attrs.is_empty() {
            out.push(rules[len - 1].clone());
        }
        rules = out;
        if !changed {
            break;
        }
    }
    rules
}

/// Selector contexts that historically break under naive combination
fn can_combine(a: &Rule, b: &Rule) -> bool {
    const FORBIDDEN: &[&str] = &["-ms-", ":root", "-placeholder"];
    [a, b].iter().all(|rule| {
        FORBIDDEN.iter().all(|needle| !rule.selector.value.contains(needle))
    })
}

/// Keys present with identical property+value in both blocks, subject to the
/// unmergeable vetoes and the output-size heuristic
fn properties_intersect(a: &Rule, b: &Rule) -> Option<DeclarationBlock> {
    let mut assoc = DeclarationBlock::default();
    let mut assoc_len = 0usize;
    for (key, d1) in a.attrs.iter() {
        let p1 = match &d1.property {
            Some(p) => p,
            None => continue,
        };
        let d2 = match b.attrs.get(key) {
            Some(d) => d,
            None => continue,
        };
        if d2.property.is_none() {
            continue;
        }
        if d1.value.value != d2.value.value {
            continue;
        }
        if is_unmerge_declaration(d1, &a.attrs, &b.attrs) {
            continue;
        }
        // two extra chars per declaration: the `:` and the `;`
        assoc_len += p1.value.chars().count() + d1.value.value.chars().count() + 2;
        assoc.push(key.clone(), d1.clone());
    }
    if assoc.is_empty() {
        return None;
    }
    if assoc.len() != a.attrs.len() && assoc.len() != b.attrs.len() {
        // three extra chars for the new rule: the `,` and the braces
        let selector_len =
            a.selector.value.chars().count() + b.selector.value.chars().count() + 3;
        if selector_len >= assoc_len {
            return None;
        }
    }
    Some(assoc)
}

fn value_details_equal(a: &Token, b: &Token) -> bool {
    match (a.value_detail(), b.value_detail()) {
        (Some(x), Some(y)) => {
            x.prefix == y.prefix
                && x.suffix == y.suffix
                && x.value == y.value
                && x.important == y.important
        }
        _ => false,
    }
}

/// Vetoes extraction of a declaration into a combined rule: known-quirky
/// properties, shorthand/longhand prefix collisions, and same-name
/// declarations with differing vendor-prefix/important/suffix flags
fn is_unmerge_declaration(
    item: &Declaration,
    a: &DeclarationBlock,
    b: &DeclarationBlock,
) -> bool {
    let detail = match item.property.as_ref().and_then(|p| p.property_detail()) {
        Some(d) => d,
        None => return true,
    };
    let property_name = detail.value.clone();
    let item_value = item
        .value
        .value_detail()
        .map(|d| d.value.as_str())
        .unwrap_or("");
    if config::is_unmerge_property(&property_name, item_value) {
        return true;
    }
    for block in [a, b] {
        for (_, other) in block.iter() {
            let other_detail = match other.property.as_ref().and_then(|p| p.property_detail()) {
                Some(d) => d,
                None => continue,
            };
            let other_name = &other_detail.value;
            if property_name == *other_name {
                if detail.prefix != other_detail.prefix {
                    return true;
                }
                if !value_details_equal(&item.value, &other.value) {
                    return true;
                }
            }
            if property_name.contains('-') {
                if property_name.contains(&format!("{}-", other_name)) {
                    return true;
                }
            } else if other_name.contains(&format!("{}-", property_name)) {
                return true;
            }
        }
    }
    false
}

/// Combined selector for a merged pair: comma-joined alternatives,
/// specificity bounds spanning both donors
fn assoc_selector(a: &Token, b: &Token) -> Token {
    let value = format!("{},{}", a.value, b.value);
    let mut token = Token::synthetic_from(TokenKind::Selector, value, a);
    if let (Some(sa), Some(sb)) = (a.selector_analysis(), b.selector_analysis()) {
        let equal =
            sa.specificity_equal && sb.specificity_equal && sa.min_specificity == sb.min_specificity;
        token.detail = TokenDetail::Selector(SelectorAnalysis {
            min_specificity: sa.min_specificity.min(sb.min_specificity),
            max_specificity: sa.max_specificity.max(sb.max_specificity),
            specificity_equal: equal,
            has_vendor_prefix: sa.has_vendor_prefix || sb.has_vendor_prefix,
            invalid: sa.invalid || sb.invalid,
            alternatives: sa
                .alternatives
                .iter()
                .chain(sb.alternatives.iter())
                .cloned()
                .collect(),
        });
    }
    token
}

/// Repeated merging can reintroduce the same alternative; keep first
fn dedupe_alternatives(selector: &mut Token) {
    if let Some(analysis) = selector.selector_analysis_mut() {
        if analysis.alternatives.len() > 1 {
            let mut seen: FxHashSet<String> = FxHashSet::default();
            analysis
                .alternatives
                .retain(|alt| seen.insert(serialize::alternative_text(alt)));
        }
    }
}

/// Stable name-sort, applied only when provably order-insensitive: no
/// disambiguated keys, no prefixes/suffixes, no shorthand-family member
fn sort_properties(attrs: DeclarationBlock) -> DeclarationBlock {
    for (key, declaration) in attrs.iter() {
        let detail = match declaration.property.as_ref().and_then(|p| p.property_detail()) {
            Some(d) => d,
            None => return attrs,
        };
        if *key != detail.value {
            return attrs;
        }
        if !detail.prefix.is_empty() {
            return attrs;
        }
        if let Some(value_detail) = declaration.value.value_detail() {
            if !value_detail.prefix.is_empty() || !value_detail.suffix.is_empty() {
                return attrs;
            }
        }
        if config::is_unsort_property(&detail.value) {
            return attrs;
        }
    }
    let mut entries = attrs.into_entries();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    DeclarationBlock::from_entries(entries)
}

/// Collapse margin/padding longhand children into one shorthand declaration
///
/// Two shapes merge: all four sides with no shorthand, and a shorthand with
/// explicit side overrides occurring after it in source order.
fn merge_property_children(mut attrs: DeclarationBlock, shorthand: &str) -> DeclarationBlock {
    let children = config::property_children(shorthand);
    let mut present: FxHashMap<String, bool> = FxHashMap::default();
    present.insert(shorthand.to_string(), false);
    for child in &children {
        present.insert(child.clone(), false);
    }

    for (key, declaration) in attrs.iter() {
        let property = match &declaration.property {
            Some(p) => p,
            None => return attrs,
        };
        if property.kind == TokenKind::Template
            || declaration.value.kind == TokenKind::Template
            || declaration.value.kind == TokenKind::BracketHack
        {
            return attrs;
        }
        let property_name = property.value.to_lowercase();
        if property_name != *key {
            return attrs;
        }
        if present.contains_key(&property_name) {
            let prefix_flag = property
                .property_detail()
                .map(|d| !d.prefix.is_empty())
                .unwrap_or(false);
            let value_flags = declaration
                .value
                .value_detail()
                .map(|d| !d.suffix.is_empty() || d.important || !d.prefix.is_empty())
                .unwrap_or(false);
            if prefix_flag || value_flags {
                return attrs;
            }
            present.insert(property_name, true);
        }
    }

    if present[shorthand] {
        let keys: Vec<String> = attrs.keys().cloned().collect();
        let main_index = match keys.iter().position(|k| k == shorthand) {
            Some(i) => i,
            None => return attrs,
        };
        let mut append: Vec<(usize, String)> = Vec::new();
        for (side_index, child) in children.iter().enumerate() {
            if !present[child] {
                continue;
            }
            if let Some(child_index) = keys.iter().position(|k| k == child) {
                if child_index > main_index {
                    if let Some(declaration) = attrs.get(child) {
                        append.push((side_index, declaration.value.value.clone()));
                    }
                }
            }
            attrs.remove(child);
        }
        if let Some(declaration) = attrs.get_mut(shorthand) {
            let current = declaration
                .value
                .value_detail()
                .map(|d| d.value.clone())
                .unwrap_or_else(|| declaration.value.value.clone());
            let merged = value::short_sides(&current, &append);
            declaration.value.value = merged.clone();
            if let Some(detail) = declaration.value.value_detail_mut() {
                detail.value = merged;
            } else {
                declaration.value.detail =
                    TokenDetail::Value(ValueDetail { value: merged, ..Default::default() });
            }
        }
    } else {
        if !children.iter().all(|child| present[child]) {
            return attrs;
        }
        let mut sides: Vec<String> = Vec::new();
        for child in &children {
            if let Some(declaration) = attrs.get(child) {
                sides.push(
                    declaration
                        .value
                        .value_detail()
                        .map(|d| d.value.clone())
                        .unwrap_or_else(|| declaration.value.value.clone()),
                );
            }
            attrs.remove(child);
        }
        let short = value::short_sides(&sides.join(" "), &[]);
        let mut property_token = Token::synthetic(TokenKind::Property, shorthand);
        property_token.detail = TokenDetail::Property(PropertyDetail {
            prefix: String::new(),
            value: shorthand.to_string(),
            suffix: String::new(),
        });
        let mut value_token = Token::synthetic(TokenKind::Value, short.clone());
        value_token.detail =
            TokenDetail::Value(ValueDetail { value: short, ..Default::default() });
        attrs.push(
            shorthand.to_string(),
            Declaration { property: Some(property_token), value: value_token },
        );
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_token(value: &str, important: bool) -> Token {
        let mut token = Token::synthetic(TokenKind::Value, value);
        token.detail = TokenDetail::Value(ValueDetail {
            value: value.to_string(),
            important,
            ..Default::default()
        });
        token
    }

    fn property_token(name: &str) -> Token {
        let mut token = Token::synthetic(TokenKind::Property, name);
        token.detail = TokenDetail::Property(PropertyDetail {
            prefix: String::new(),
            value: name.to_string(),
            suffix: String::new(),
        });
        token
    }

    fn declaration(name: &str, value: &str, important: bool) -> Declaration {
        Declaration {
            property: Some(property_token(name)),
            value: value_token(value, important),
        }
    }

    #[test]
    fn test_merge_replaces_plain_declaration() {
        let mut block = DeclarationBlock::default();
        block.merge("color".to_string(), declaration("color", "red", false));
        block.merge("color".to_string(), declaration("color", "blue", false));
        assert_eq!(block.len(), 1);
        let detail = block.get("color").unwrap().value.value_detail().unwrap().clone();
        assert_eq!(detail.value, "blue");
    }

    #[test]
    fn test_merge_keeps_important_declaration() {
        let mut block = DeclarationBlock::default();
        block.merge("color".to_string(), declaration("color", "red", true));
        block.merge("color".to_string(), declaration("color", "blue", false));
        let detail = block.get("color").unwrap().value.value_detail().unwrap().clone();
        assert_eq!(detail.value, "red");
        assert!(detail.important);
    }

    #[test]
    fn test_merge_important_overrides_important() {
        let mut block = DeclarationBlock::default();
        block.merge("color".to_string(), declaration("color", "red", true));
        block.merge("color".to_string(), declaration("color", "blue", true));
        let detail = block.get("color").unwrap().value.value_detail().unwrap().clone();
        assert_eq!(detail.value, "blue");
    }

    #[test]
    fn test_sort_properties_plain_block() {
        let mut block = DeclarationBlock::default();
        block.push("width".to_string(), declaration("width", "1px", false));
        block.push("color".to_string(), declaration("color", "red", false));
        let sorted = sort_properties(block);
        let keys: Vec<_> = sorted.keys().cloned().collect();
        assert_eq!(keys, vec!["color", "width"]);
    }

    #[test]
    fn test_sort_properties_bails_on_shorthand_family() {
        let mut block = DeclarationBlock::default();
        block.push("margin".to_string(), declaration("margin", "0", false));
        block.push("color".to_string(), declaration("color", "red", false));
        let sorted = sort_properties(block);
        let keys: Vec<_> = sorted.keys().cloned().collect();
        assert_eq!(keys, vec!["margin", "color"]);
    }

    #[test]
    fn test_merge_children_all_sides() {
        let mut block = DeclarationBlock::default();
        for (side, v) in [("top", "10px"), ("right", "20px"), ("bottom", "10px"), ("left", "20px")]
        {
            let name = format!("margin-{}", side);
            block.push(name.clone(), declaration(&name, v, false));
        }
        let merged = merge_property_children(block, "margin");
        assert_eq!(merged.len(), 1);
        let detail = merged.get("margin").unwrap().value.value_detail().unwrap().clone();
        assert_eq!(detail.value, "10px 20px");
    }

    #[test]
    fn test_merge_children_shorthand_with_late_override() {
        let mut block = DeclarationBlock::default();
        block.push("padding".to_string(), declaration("padding", "0 26px 20px", false));
        block.push(
            "padding-top".to_string(),
            declaration("padding-top", "20px", false),
        );
        let merged = merge_property_children(block, "padding");
        assert_eq!(merged.len(), 1);
        // top=20 right=26 bottom=20 left=26 collapses to two values
        let detail = merged.get("padding").unwrap().value.value_detail().unwrap().clone();
        assert_eq!(detail.value, "20px 26px");
    }

    #[test]
    fn test_merge_children_early_override_kept_separate() {
        // the side declaration precedes the shorthand, so folding it in
        // would change the cascade
        let mut block = DeclarationBlock::default();
        block.push(
            "padding-top".to_string(),
            declaration("padding-top", "20px", false),
        );
        block.push("padding".to_string(), declaration("padding", "0 26px 20px", false));
        let merged = merge_property_children(block, "padding");
        assert_eq!(merged.len(), 1);
        let detail = merged.get("padding").unwrap().value.value_detail().unwrap().clone();
        assert_eq!(detail.value, "0 26px 20px");
    }

    #[test]
    fn test_merge_children_important_blocks_merge() {
        let mut block = DeclarationBlock::default();
        for (side, v) in [("top", "1px"), ("right", "1px"), ("bottom", "1px"), ("left", "1px")] {
            let name = format!("margin-{}", side);
            block.push(name.clone(), declaration(&name, v, side == "top"));
        }
        let merged = merge_property_children(block, "margin");
        assert_eq!(merged.len(), 4);
    }
}
