//! 値の深い抽出
//!
//! 引数やレシーバから到達できるオブジェクトグラフを再帰的に走査し、
//! ロガーへ書き出します。同一性を持つ値（配列・クラス・オブジェクト）は
//! 訪問済み集合で循環を断ち切ります。訪問済み集合は1回の実行全体で共有され、
//! フレームや停止をまたいでもリセットされません。

use crate::Result;
use stacktwin_target::{FieldHandle, ObjectId, RefTypeId, RuntimeValue, Session, SessionError};
use stacktwin_trace::TraceLogger;
use std::collections::HashSet;
use tracing::debug;

/// 再帰の深さ上限（0 は無制限）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthBudget(usize);

impl DepthBudget {
    pub const UNLIMITED: DepthBudget = DepthBudget(0);

    pub fn new(max_depth: usize) -> Self {
        Self(max_depth)
    }

    pub fn is_unlimited(&self) -> bool {
        self.0 == 0
    }

    pub fn max_depth(&self) -> usize {
        self.0
    }

    /// 深さが上限を超えているか
    pub fn exceeded(&self, depth: usize) -> bool {
        !self.is_unlimited() && depth > self.0
    }
}

/// 参照値の種類
#[derive(Debug, Clone, Copy)]
enum Reference {
    Array,
    ClassMetadata,
    Composite,
}

/// スタック値の抽出器
pub struct StackExtractor<L: TraceLogger> {
    logger: L,
    budget: DepthBudget,
    visited: HashSet<ObjectId>,
}

impl<L: TraceLogger> StackExtractor<L> {
    pub fn new(logger: L, budget: DepthBudget) -> Self {
        Self {
            logger,
            budget,
            visited: HashSet::new(),
        }
    }

    pub fn logger_mut(&mut self) -> &mut L {
        &mut self.logger
    }

    /// 展開済みの同一性の数
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// ロガーを閉じる
    pub fn finish(&mut self) -> Result<()> {
        self.logger.finish()
    }

    /// 値を抽出する
    pub fn extract<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        value: RuntimeValue,
        depth: usize,
    ) -> Result<()> {
        if self.budget.exceeded(depth) {
            return self.logger.depth_limit(depth);
        }

        match value {
            RuntimeValue::Null => self.logger.null_value(),
            RuntimeValue::Primitive(p) => self.logger.primitive(&p),
            RuntimeValue::String(id) => match session.string_value(id) {
                Ok(text) => self.logger.string(&text),
                Err(SessionError::Inaccessible(reason)) => {
                    debug!("String {} is inaccessible: {}", id, reason);
                    self.logger.inaccessible_value()
                }
                Err(e) => Err(e.into()),
            },
            RuntimeValue::Array(id) => self.extract_reference(session, id, Reference::Array, depth),
            RuntimeValue::ClassObject(id) => {
                self.extract_reference(session, id, Reference::ClassMetadata, depth)
            }
            RuntimeValue::Object(id) => {
                self.extract_reference(session, id, Reference::Composite, depth)
            }
        }
    }

    fn extract_reference<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        id: ObjectId,
        kind: Reference,
        depth: usize,
    ) -> Result<()> {
        let ty = match session.runtime_type(id) {
            Ok(ty) => ty,
            Err(SessionError::Inaccessible(reason)) => {
                debug!("Reference {} is inaccessible: {}", id, reason);
                return self.logger.inaccessible_value();
            }
            Err(e) => return Err(e.into()),
        };
        let type_name = session.type_name(ty)?;
        self.logger.reference_open(id, &type_name, depth)?;

        if !self.visited.insert(id) {
            self.logger.already_visited()?;
        } else {
            match kind {
                Reference::Array => self.extract_elements(session, id, depth)?,
                Reference::ClassMetadata => match session.reflected_type(id) {
                    Ok(reflected) => self.extract_fields(session, id, reflected, depth, true)?,
                    Err(SessionError::Inaccessible(reason)) => {
                        debug!("Class object {} is inaccessible: {}", id, reason);
                        self.logger.inaccessible_value()?;
                    }
                    Err(e) => return Err(e.into()),
                },
                Reference::Composite => self.extract_fields(session, id, ty, depth, false)?,
            }
        }

        self.logger.reference_close()
    }

    fn extract_elements<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        array: ObjectId,
        depth: usize,
    ) -> Result<()> {
        let elements = match session.array_elements(array) {
            Ok(elements) => elements,
            Err(SessionError::Inaccessible(reason)) => {
                debug!("Array {} is inaccessible: {}", array, reason);
                return self.logger.inaccessible_value();
            }
            Err(e) => return Err(e.into()),
        };
        if elements.is_empty() {
            return self.logger.empty_array();
        }
        if self.budget.exceeded(depth + 1) {
            return self.logger.depth_limit(depth + 1);
        }

        self.logger.array_start()?;
        for (index, element) in elements.into_iter().enumerate() {
            if index > 0 {
                self.logger.separator()?;
            }
            self.logger.element_start(index, depth + 1)?;
            self.extract(session, element, depth + 1)?;
            self.logger.element_end()?;
        }
        self.logger.array_end()
    }

    /// フィールドを列挙する。`statics_only` ならクラスレベルのフィールドだけ
    fn extract_fields<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        holder: ObjectId,
        ty: RefTypeId,
        depth: usize,
        statics_only: bool,
    ) -> Result<()> {
        if !session.is_type_ready(ty)? {
            return self.logger.type_not_ready();
        }

        let fields: Vec<FieldHandle> = session
            .fields(ty)?
            .into_iter()
            .filter(|f| !statics_only || f.is_static)
            .collect();
        let labels = field_labels(session, &fields)?;

        self.logger.fields_start()?;
        for (index, (field, label)) in fields.iter().zip(&labels).enumerate() {
            if index > 0 {
                self.logger.separator()?;
            }
            match session.read_field(holder, field) {
                Ok(value) => {
                    self.logger.field_start(label, depth + 1)?;
                    self.extract(session, value, depth + 1)?;
                    self.logger.field_end()?;
                }
                Err(SessionError::Inaccessible(reason)) => {
                    debug!("Field {} of {} is inaccessible: {}", label, holder, reason);
                    self.logger.inaccessible_field(label, depth + 1)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.logger.fields_end()
    }
}

/// フィールドの表示名を決める
///
/// フィールドは最も派生した型から順に並ぶので、最初に現れた名前はそのまま使い、
/// 隠された同名フィールドは宣言型で修飾する（`app.Base.x`）。
fn field_labels<S: Session + ?Sized>(session: &mut S, fields: &[FieldHandle]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut labels = Vec::with_capacity(fields.len());
    for field in fields {
        if seen.insert(field.name.as_str()) {
            labels.push(field.name.clone());
        } else {
            let owner = session.type_name(field.declaring_type)?;
            labels.push(format!("{}.{}", owner, field.name));
        }
    }
    Ok(labels)
}
